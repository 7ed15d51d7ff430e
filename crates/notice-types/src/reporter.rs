//! The workspace's logging idiom: a minimal `info`/`warn`/`error` sink
//! trait rather than a `tracing`/`log` dependency, so the CLI and any
//! embedder can wire their own sink (mirrors this workspace's own
//! `Reporter` trait).

pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}
