use crate::domain::model::{PlanStep, RunStats};
use crate::domain::ports::ProtocolExecutor;
use crate::utils::error::Result;

/// Drives a finished plan through the executor port, step by step, in plan
/// order. The checkpoint blocks until the executor's `pause` returns.
pub struct ProtocolRunner<E: ProtocolExecutor> {
    executor: E,
}

impl<E: ProtocolExecutor> ProtocolRunner<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn run(&self, steps: &[PlanStep]) -> Result<RunStats> {
        tracing::info!("Executing {} plan steps...", steps.len());
        let mut stats = RunStats::default();

        for step in steps {
            match step {
                PlanStep::Checkpoint { message } => {
                    tracing::info!("Checkpoint: {}", message);
                    self.executor.pause(message).await?;
                    stats.checkpoints += 1;
                }
                PlanStep::Transfer(instruction) => {
                    tracing::debug!(
                        "{} {:.2} uL {} -> {} ({})",
                        instruction.column,
                        instruction.volume,
                        instruction.source,
                        instruction.dest_well,
                        instruction.channel
                    );
                    self.executor.dispense(instruction).await?;
                    stats.dispensed += 1;
                }
            }
        }

        tracing::info!(
            "Run complete: {} dispenses, {} checkpoints",
            stats.dispensed,
            stats.checkpoints
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        Column, SourceAddress, SourcePlate, TransferCategory, TransferInstruction, WellId,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    enum Event {
        Dispense(String),
        Pause(String),
    }

    #[derive(Clone)]
    struct RecordingExecutor {
        events: Arc<Mutex<Vec<Event>>>,
    }

    #[async_trait]
    impl ProtocolExecutor for RecordingExecutor {
        async fn dispense(&self, instruction: &TransferInstruction) -> Result<()> {
            self.events
                .lock()
                .await
                .push(Event::Dispense(instruction.dest_well.as_str().to_string()));
            Ok(())
        }

        async fn pause(&self, message: &str) -> Result<()> {
            self.events
                .lock()
                .await
                .push(Event::Pause(message.to_string()));
            Ok(())
        }
    }

    fn transfer(dest: &str) -> PlanStep {
        PlanStep::Transfer(TransferInstruction {
            category: TransferCategory::Culture,
            column: Column::Culture,
            source: SourceAddress {
                plate: SourcePlate::StockFresh,
                well: WellId::new("A1"),
            },
            dest_well: WellId::new(dest),
            volume: 15.0,
            channel: "p20".to_string(),
            mix_after: None,
        })
    }

    #[tokio::test]
    async fn test_steps_reach_executor_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let runner = ProtocolRunner::new(RecordingExecutor {
            events: events.clone(),
        });

        let steps = vec![
            transfer("A1"),
            PlanStep::Checkpoint {
                message: "swap plates".to_string(),
            },
            transfer("A2"),
        ];
        let stats = runner.run(&steps).await.unwrap();

        assert_eq!(stats.dispensed, 2);
        assert_eq!(stats.checkpoints, 1);
        assert_eq!(
            *events.lock().await,
            vec![
                Event::Dispense("A1".to_string()),
                Event::Pause("swap plates".to_string()),
                Event::Dispense("A2".to_string()),
            ]
        );
    }
}
