// Sources of the uniform draw used to settle battles.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::error::MealMaxError;

pub const RANDOM_ORG_URL: &str =
    "https://www.random.org/decimal-fractions/?num=1&dec=2&col=1&format=plain&rnd=new";

/// Produces values uniformly distributed in [0, 1).
#[async_trait]
pub trait RandomSource: Send + Sync {
    async fn draw(&self) -> Result<f64, MealMaxError>;
}

/// Local thread RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

#[async_trait]
impl RandomSource for ThreadRandom {
    async fn draw(&self) -> Result<f64, MealMaxError> {
        Ok(rand::thread_rng().gen_range(0.0..1.0))
    }
}

/// Replays a fixed sequence of draws, then fails once it runs dry.
#[derive(Debug, Default)]
pub struct FixedRandom {
    values: Mutex<VecDeque<f64>>,
}

impl FixedRandom {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }
}

#[async_trait]
impl RandomSource for FixedRandom {
    async fn draw(&self) -> Result<f64, MealMaxError> {
        let next = self
            .values
            .lock()
            .map_err(|_| MealMaxError::Internal("random sequence lock poisoned".into()))?
            .pop_front();
        next.ok_or_else(|| {
            MealMaxError::RandomSourceUnavailable("Fixed random sequence exhausted".into())
        })
    }
}

/// Draws a two-decimal fraction from random.org.
#[derive(Debug, Clone)]
pub struct RandomOrg {
    client: reqwest::Client,
    url: String,
}

impl RandomOrg {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, MealMaxError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MealMaxError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RandomSource for RandomOrg {
    async fn draw(&self) -> Result<f64, MealMaxError> {
        tracing::debug!(url = %self.url, "Fetching random number from random.org");
        let response = self.client.get(&self.url).send().await.map_err(request_error)?;
        let body = response
            .error_for_status()
            .map_err(request_error)?
            .text()
            .await
            .map_err(request_error)?;
        parse_fraction(&body)
    }
}

fn request_error(e: reqwest::Error) -> MealMaxError {
    if e.is_timeout() {
        MealMaxError::RandomSourceUnavailable("Request to random.org timed out.".into())
    } else {
        MealMaxError::RandomSourceUnavailable(format!("Request to random.org failed: {e}"))
    }
}

fn parse_fraction(body: &str) -> Result<f64, MealMaxError> {
    let trimmed = body.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if (0.0..1.0).contains(&value) => Ok(value),
        _ => Err(MealMaxError::RandomSourceUnavailable(format!(
            "Invalid response from random.org: {trimmed}"
        ))),
    }
}
