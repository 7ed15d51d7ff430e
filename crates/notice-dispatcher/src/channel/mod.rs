//! Optional channel-delivery conveniences. Per-channel delivery workers
//! are out of scope for `process_event` itself; these exist only so a
//! CLI demo has something to point a `WebhookDeliveryJob` at without
//! standing up a real worker.

pub mod webhook;
