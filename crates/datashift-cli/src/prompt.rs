//! Interactive extension selection prompt.

use async_trait::async_trait;
use datashift::{Direction, ExtensionSelector, MigrateError};
use dialoguer::Select;
use tokio_util::sync::CancellationToken;

/// Numbered-list prompt over the loaded extension names.
///
/// The prompt runs on a blocking thread so cancellation (Ctrl-C) unblocks
/// the run immediately instead of waiting for input.
pub struct PromptSelector;

#[async_trait]
impl ExtensionSelector for PromptSelector {
    async fn pick(
        &self,
        direction: Direction,
        names: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<String, MigrateError> {
        if names.is_empty() {
            return Err(MigrateError::Config(format!(
                "No {} extensions are loaded",
                direction
            )));
        }

        let title = format!("Select the {} extension", direction);
        let items = names.clone();
        let prompt = tokio::task::spawn_blocking(move || {
            Select::new()
                .with_prompt(title)
                .items(&items)
                .default(0)
                .interact_opt()
        });

        tokio::select! {
            _ = cancel.cancelled() => Err(MigrateError::Cancelled),
            result = prompt => match result {
                Ok(Ok(Some(index))) => names.get(index).cloned().ok_or_else(|| {
                    MigrateError::Config("Selection index out of range".to_string())
                }),
                Ok(Ok(None)) => Err(MigrateError::Cancelled),
                Ok(Err(e)) => Err(MigrateError::Config(format!(
                    "Selection prompt failed: {}",
                    e
                ))),
                Err(e) => Err(MigrateError::Config(format!(
                    "Selection prompt aborted: {}",
                    e
                ))),
            },
        }
    }
}
