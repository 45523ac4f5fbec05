use async_trait::async_trait;
use color_eyre::Result;
use serde_json::Value;

/// Sort direction for ordered selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  #[allow(dead_code)]
  Ascending,
  Descending,
}

impl Direction {
  pub fn as_str(self) -> &'static str {
    match self {
      Direction::Ascending => "asc",
      Direction::Descending => "desc",
    }
  }
}

/// The remote source of truth.
///
/// Rows travel as JSON objects in the remote's own naming; translation into
/// local records happens in the sync engine.
#[async_trait]
pub trait RemoteSource: Send + Sync {
  /// Whether credentials are present and not placeholders.
  fn is_configured(&self) -> bool;

  /// Fetch every row of `table` ordered by `order_by`.
  async fn select_ordered(
    &self,
    table: &str,
    order_by: &str,
    direction: Direction,
  ) -> Result<Vec<Value>>;

  /// Insert or update `rows` in `table`, keyed by primary key.
  async fn upsert(&self, table: &str, rows: Vec<Value>) -> Result<()>;
}
