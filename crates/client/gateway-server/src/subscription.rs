use alloy::json_abi::Event;
use alloy::primitives::Address;
use async_trait::async_trait;
use ec_registry::ABILocation;
use serde_json::Value;

/// Event subscription backend. The store behind it (stream definitions,
/// checkpoints) lives outside this crate; the gateway only validates the
/// request and forwards it.
#[async_trait]
pub trait SubscriptionManager: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn add_subscription(
        &self,
        address: Option<Address>,
        location: &ABILocation,
        event: &Event,
        stream_id: &str,
        from_block: &str,
        name: &str,
    ) -> anyhow::Result<Value>;
}
