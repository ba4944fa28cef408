use crate::config::PlanConfig;
use crate::domain::model::TransferInstruction;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn plan_config(&self) -> &PlanConfig;
    fn input_paths(&self) -> &crate::config::InputPaths;
    fn output_path(&self) -> &str;
}

/// The host robot runtime, seen from the planner. Both calls are opaque,
/// ordered, side-effecting operations: `dispense` moves liquid with a fresh
/// tip, `pause` blocks until the operator acknowledges.
#[async_trait]
pub trait ProtocolExecutor: Send + Sync {
    async fn dispense(&self, instruction: &TransferInstruction) -> Result<()>;
    async fn pause(&self, message: &str) -> Result<()>;
}
