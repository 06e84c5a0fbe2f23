use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event_source::{EventSource, SwapEvent};
use crate::pool::{Pool, PoolConfig, PoolState};
use crate::position::PositionManager;
use crate::strategy::{Context, Strategy};

const PROGRESS_LOG_INTERVAL: u64 = 1000;

/// Deterministic time-stepped driver. Owns the clock and is the sole
/// mutator of the Pool and PositionManager; strategy callbacks only observe
/// and issue commands through `Context`.
pub struct Engine {
    config: EngineConfig,
    pool: Pool,
    manager: PositionManager,
    source: Box<dyn EventSource>,
    strategy: Box<dyn Strategy>,
    pending: Option<SwapEvent>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        source: Box<dyn EventSource>,
        strategy: Box<dyn Strategy>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let pool_config = PoolConfig {
            pool_id: config.pool_id.clone(),
            token0_name: config.token0_name.clone(),
            token1_name: config.token1_name.clone(),
            decimals0: config.decimals0,
            decimals1: config.decimals1,
            fee_rate_ppm: config.fee_rate_ppm,
            tick_spacing: config.tick_spacing,
        };
        // Zeroed until the first event primes it in `run`; ingest never
        // reads the pre-prime state when `liquidity_active == 0`.
        let seed = PoolState {
            sqrt_price_x64: ethnum::U256::ZERO,
            tick_current: 0,
            liquidity_active: 0,
            timestamp_ms: config.start_time,
            fee_growth_global_0: ethnum::U256::ZERO,
            fee_growth_global_1: ethnum::U256::ZERO,
        };
        let pool = Pool::new(pool_config, seed)?;
        let manager = PositionManager::new(config.invest0, config.invest1, config.simulate_errors);

        Ok(Self {
            config,
            pool,
            manager,
            source,
            strategy,
            pending: None,
        })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn manager(&self) -> &PositionManager {
        &self.manager
    }

    async fn pull_pending(&mut self) -> Result<(), EngineError> {
        if self.pending.is_none() {
            self.pending = self.source.next_event().await?;
        }
        Ok(())
    }

    /// Pulls every buffered event whose timestamp has come due (`<=
    /// timestamp`), applying each to the Pool and PositionManager in order.
    async fn drain_due_events(&mut self, timestamp: u64) -> Result<Vec<SwapEvent>, EngineError> {
        let mut due = Vec::new();
        self.pull_pending().await?;
        while let Some(event) = &self.pending {
            if event.timestamp_ms > timestamp {
                break;
            }
            let event = self.pending.take().unwrap();
            due.push(event);
            self.pull_pending().await?;
        }
        Ok(due)
    }

    pub async fn run(&mut self, cancel: &AtomicBool) -> Result<(), EngineError> {
        if let Some(first) = self.source.next_event().await? {
            self.pool.ingest(&first)?;
        }

        {
            let mut ctx = Context {
                timestamp_ms: self.config.start_time,
                step_index: 0,
                pool: &self.pool,
                manager: &mut self.manager,
            };
            self.strategy.on_init(&mut ctx).await;
        }

        let mut step_index: u64 = 0;
        let mut timestamp = self.config.start_time;

        while timestamp <= self.config.end_time {
            if cancel.load(Ordering::Relaxed) {
                return Err(EngineError::Cancelled { step_index });
            }

            let due = self.drain_due_events(timestamp).await?;
            for event in &due {
                self.pool.ingest(event)?;
                self.manager.update_all_position_fees(&self.pool)?;
                let mut ctx = Context {
                    timestamp_ms: timestamp,
                    step_index,
                    pool: &self.pool,
                    manager: &mut self.manager,
                };
                self.strategy.on_swap_event(&mut ctx, event).await;
            }

            {
                let mut ctx = Context {
                    timestamp_ms: timestamp,
                    step_index,
                    pool: &self.pool,
                    manager: &mut self.manager,
                };
                self.strategy.on_tick(&mut ctx).await;
            }

            if step_index > 0 && step_index % PROGRESS_LOG_INTERVAL == 0 {
                tracing::info!(step_index, timestamp, "backtest progress");
            }

            step_index += 1;
            timestamp = self.config.start_time + step_index * self.config.step_ms;
        }

        let mut ctx = Context {
            timestamp_ms: timestamp,
            step_index,
            pool: &self.pool,
            manager: &mut self.manager,
        };
        self.strategy.on_finish(&mut ctx).await;

        Ok(())
    }
}
