use crate::{config::GlobalConfig, DeviceProperties};

use super::TuneError;

/// Environment variable overriding the block size at which block growth switches from additive
/// to multiplicative.
pub const TUNING_THRESHOLD_ENV: &str = "LAUNCHTUNE_TUNING_THRESHOLD";

/// Everything the traversal algorithms need to know about the device being tuned for.
///
/// The context is built once per device and passed by reference to every traversal call.
#[derive(Debug, Clone)]
pub struct TuneContext {
    properties: DeviceProperties,
    block_threshold: u32,
}

impl TuneContext {
    /// Create a context for the device.
    ///
    /// The block growth threshold is read from [TUNING_THRESHOLD_ENV] if set, otherwise from the
    /// autotune configuration, and defaults to the maximum block extent along x.
    pub fn new(properties: DeviceProperties) -> Result<Self, TuneError> {
        let threshold = match std::env::var(TUNING_THRESHOLD_ENV) {
            Ok(value) => {
                let threshold =
                    value
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| TuneError::InvalidThreshold {
                            value: value.clone(),
                            max: properties.max_block_dim.x,
                        })?;
                Some(threshold)
            }
            Err(_) => GlobalConfig::get().autotune.block_threshold,
        };

        Self::with_block_threshold(properties, threshold)
    }

    /// Create a context with an explicit block growth threshold.
    pub fn with_block_threshold(
        properties: DeviceProperties,
        threshold: Option<u32>,
    ) -> Result<Self, TuneError> {
        let max = properties.max_block_dim.x;
        let block_threshold = threshold.unwrap_or(max);

        if block_threshold > max {
            return Err(TuneError::InvalidThreshold {
                value: block_threshold.to_string(),
                max,
            });
        }

        Ok(Self {
            properties,
            block_threshold,
        })
    }

    /// The device properties.
    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    /// Block size below which block growth is additive.
    pub fn block_threshold(&self) -> u32 {
        self.block_threshold
    }
}
