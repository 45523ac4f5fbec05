/// Schema for the local record collection and the key-value table.
pub const SCHEMA: &str = r#"
-- Blog posts mirrored from the remote source
CREATE TABLE IF NOT EXISTS blogs (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    author TEXT NOT NULL,
    author_email TEXT NOT NULL,
    published_at INTEGER NOT NULL,
    excerpt TEXT,
    cover_image TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_blogs_published ON blogs(published_at);

-- Small durable settings (last sync timestamp)
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
"#;
