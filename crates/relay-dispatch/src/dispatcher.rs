//! The dispatcher service.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::ports::{Messenger, SendOptions};
use crate::report::{DeliveryOutcome, DeliveryReport, RecipientGroups};
use relay_codec::Operation;

/// Dispatcher policy knobs.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Delay between successive deliveries. A rate-limit courtesy, not a
    /// correctness requirement.
    pub pace: Duration,
    /// Base URL for profile links embedded in the message.
    pub profile_url_base: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pace: Duration::from_millis(300),
            profile_url_base: "https://efp.app".to_string(),
        }
    }
}

/// Render the rich-text notification for one operation.
///
/// Format: `<operator-link> <action> <target-link> [as 'tag']`.
pub fn format_message(
    config: &DispatchConfig,
    operation: &Operation,
    operator_name: &str,
    target_name: &str,
) -> String {
    let link = |name: &str| {
        format!(
            r#"<a href="{}/{}">{}</a>"#,
            config.profile_url_base, name, name
        )
    };
    format!(
        "{} {} {}{}",
        link(operator_name),
        operation.opcode.description(),
        link(target_name),
        operation.tag_suffix()
    )
}

/// Delivers one event's notification to each distinct recipient.
pub struct Dispatcher<M: Messenger> {
    messenger: Arc<M>,
    config: DispatchConfig,
}

impl<M: Messenger> Dispatcher<M> {
    pub fn new(messenger: Arc<M>, config: DispatchConfig) -> Self {
        Self { messenger, config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Deliver the notification for `operation` to every recipient.
    ///
    /// Each delivery is attempted independently; a failure is recorded in
    /// the report and never aborts the remaining recipients.
    pub async fn notify(
        &self,
        operation: &Operation,
        operator_name: &str,
        target_name: &str,
        recipients: &RecipientGroups,
    ) -> DeliveryReport {
        let message = format_message(&self.config, operation, operator_name, target_name);
        let log_line = format!(
            "{} {} {}{}",
            operator_name,
            operation.opcode.description(),
            target_name,
            operation.tag_suffix()
        );
        let options = SendOptions::default();

        let mut report = DeliveryReport::default();
        for (i, chat) in recipients.delivery_order().into_iter().enumerate() {
            if i > 0 && !self.config.pace.is_zero() {
                tokio::time::sleep(self.config.pace).await;
            }
            let result = self.messenger.send(chat, &message, &options).await;
            match &result {
                Ok(()) => info!(chat_id = chat, "{log_line}"),
                Err(e) => warn!(chat_id = chat, error = %e, "Delivery failed"),
            }
            report.outcomes.push(DeliveryOutcome { chat, result });
        }
        report
    }
}
