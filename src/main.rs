mod app;
mod cache;
mod config;
mod db;
mod logging;
mod remote;
mod sync;
#[cfg(test)]
mod testing;

use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

use db::BlogRecord;
use sync::{PullOutcome, SyncReport};

#[derive(Parser, Debug)]
#[command(name = "blogsync")]
#[command(about = "Offline-first blog sync with a TTL cache and background refresh")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/blogsync/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Sync on start if stale, then keep syncing in the background (default)
  Run,
  /// Sync if the cache is stale
  Sync {
    /// Sync even if the cache is still fresh
    #[arg(short, long)]
    force: bool,
  },
  /// Upload local posts to the remote
  Push,
  /// Show cache and scheduler state
  Status,
  /// Forget the last sync time so the next start syncs
  ClearCache,
  /// List local posts, newest first
  List,
  /// Show one post
  Show {
    id: String,
    /// Keep syncing in the background and print the post whenever it changes
    #[arg(short, long)]
    watch: bool,
  },
}

fn format_time(ms: i64) -> String {
  DateTime::from_timestamp_millis(ms)
    .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_else(|| ms.to_string())
}

fn print_post(post: &BlogRecord) {
  println!("{}", post.title);
  println!("by {} <{}>", post.author, post.author_email);
  println!("published {}", format_time(post.published_at));
  if let Some(excerpt) = &post.excerpt {
    println!("\n{}", excerpt);
  }
  if let Some(cover) = &post.cover_image {
    println!("cover: {}", cover);
  }
  println!("\n{}", post.content);
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  let app = app::App::new(&config)?;

  match args.command.unwrap_or(Command::Run) {
    Command::Run => app.run().await?,
    Command::Sync { force } => match app.sync(force).await {
      None => println!("cache still fresh, nothing to do (use --force to sync anyway)"),
      Some(run) => {
        println!("{}", run.report);
        if let SyncReport::Completed(PullOutcome::Fallback { reason, .. }) = &run.report {
          println!("remote not used: {}", reason);
        }
        if !run.recorded {
          println!("warning: last sync time was not saved");
        }
      }
    },
    Command::Push => println!("{}", app.push().await),
    Command::Status => {
      let status = app.status().await?;
      println!(
        "remote:      {}",
        if status.remote_configured {
          "configured"
        } else {
          "not configured (built-in posts)"
        }
      );
      println!(
        "last sync:   {}",
        status
          .last_sync
          .map(|t| format_time(t.timestamp_millis()))
          .unwrap_or_else(|| "never".to_string())
      );
      println!(
        "cache:       {} ({}s of {}s left)",
        if status.cache_valid { "valid" } else { "stale" },
        status.expires_in.as_secs(),
        status.ttl.as_secs()
      );
      println!("posts:       {}", status.records);
      println!(
        "background:  {}, every {}s, skipped while younger than {}s",
        if status.scheduler.is_running { "running" } else { "idle" },
        status.scheduler.interval.as_secs(),
        status.scheduler.min_cache_ttl.as_secs()
      );
    }
    Command::ClearCache => {
      if !app.clear_cache().await {
        return Err(eyre!("Failed to clear cache, see log for details"));
      }
      println!("cache cleared");
    }
    Command::List => {
      for post in app.latest()? {
        println!(
          "{:>8}  {}  {}  ({})",
          post.id,
          format_time(post.published_at),
          post.title,
          post.author
        );
      }
    }
    Command::Show { id, watch: false } => {
      let post = app
        .find(&id)?
        .ok_or_else(|| eyre!("No post with id {}", id))?;
      print_post(&post);
    }
    Command::Show { id, watch: true } => {
      app
        .watch(&id, |post| match post {
          Some(post) => {
            print_post(post);
            println!("\n---");
          }
          None => println!("post {} not available yet", id),
        })
        .await?
    }
  }

  Ok(())
}
