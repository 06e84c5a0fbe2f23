use async_trait::async_trait;

use crate::event_source::SwapEvent;
use crate::pool::Pool;
use crate::position::PositionManager;

/// Everything a strategy callback can see or touch during one step. The
/// Engine constructs a fresh `Context` per callback; nothing it borrows
/// outlives that call.
pub struct Context<'a> {
    pub timestamp_ms: u64,
    pub step_index: u64,
    pub pool: &'a Pool,
    pub manager: &'a mut PositionManager,
}

/// The capability set a backtest driver invokes. `on_swap_event` and
/// `on_finish` are optional in spirit — implement them as no-ops when a
/// strategy doesn't care about a given hook.
#[async_trait]
pub trait Strategy: Send {
    fn id(&self) -> &str;

    async fn on_init(&mut self, ctx: &mut Context<'_>);

    async fn on_tick(&mut self, ctx: &mut Context<'_>);

    async fn on_swap_event(&mut self, _ctx: &mut Context<'_>, _event: &SwapEvent) {}

    async fn on_finish(&mut self, _ctx: &mut Context<'_>) {}
}
