use crate::domain::model::TransferInstruction;
use crate::domain::ports::ProtocolExecutor;
use crate::utils::error::{PrepError, Result};
use async_trait::async_trait;

/// Executor that narrates the protocol instead of moving liquid. In
/// interactive mode the checkpoint blocks until the operator presses Enter;
/// otherwise it acknowledges immediately.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    interactive: bool,
}

impl SimulatedExecutor {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

#[async_trait]
impl ProtocolExecutor for SimulatedExecutor {
    async fn dispense(&self, instruction: &TransferInstruction) -> Result<()> {
        let mix = match instruction.mix_after {
            Some(mix) => format!(", mix {}x{:.0} uL", mix.repetitions, mix.volume),
            None => String::new(),
        };
        tracing::info!(
            "[sim] {}: {:.2} uL {} -> {} with {} (fresh tip{})",
            instruction.column,
            instruction.volume,
            instruction.source,
            instruction.dest_well,
            instruction.channel,
            mix
        );
        Ok(())
    }

    async fn pause(&self, message: &str) -> Result<()> {
        tracing::warn!("[sim] PAUSED: {}", message);
        if !self.interactive {
            return Ok(());
        }

        println!("\n*** PAUSED: {} ***", message);
        println!("Press Enter to resume...");
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| ())
        })
        .await
        .map_err(|e| PrepError::ExecutorError {
            message: format!("checkpoint wait failed: {}", e),
        })??;
        Ok(())
    }
}
