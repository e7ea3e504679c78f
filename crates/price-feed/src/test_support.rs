//! Scripted price sources for tests

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use homeboard_core::{PriceFeedError, PriceFeedResult, PriceReading};

use crate::PriceSource;

pub struct ScriptedSource {
    name: String,
    reading: Option<(Decimal, Decimal)>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn ok(name: &str, gold: Decimal, silver: Decimal) -> Self {
        Self {
            name: name.to_string(),
            reading: Some((gold, silver)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reading: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> PriceFeedResult<PriceReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.reading {
            Some((gold, silver)) => Ok(PriceReading::new(self.name.clone(), gold, silver)),
            None => Err(PriceFeedError::BadStatus {
                source_name: self.name.clone(),
                status: 503,
            }),
        }
    }
}
