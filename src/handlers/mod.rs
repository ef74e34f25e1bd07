pub mod webhook;

pub use webhook::{WebhookSecrets, webhook_config};
