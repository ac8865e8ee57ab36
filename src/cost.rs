//! Cost computation for reported token usage.
//!
//! Each counter is multiplied by the matching per-token price of the model.
//! Cache prices are optional and count as zero when a model has none.

use crate::catalog::ModelDescriptor;
use crate::error::Error;
use crate::types::Usage;

/// Cost in USD for token usage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cost {
    /// Cost for input tokens in USD.
    pub input_cost: f64,
    /// Cost for output tokens in USD.
    pub output_cost: f64,
    /// Cost for cache writes in USD.
    pub cache_write_cost: f64,
    /// Cost for cache reads in USD.
    pub cache_read_cost: f64,
}

impl Cost {
    /// Total cost in USD.
    pub fn total(&self) -> f64 {
        self.input_cost + self.output_cost + self.cache_write_cost + self.cache_read_cost
    }
}

impl ModelDescriptor {
    /// Calculate cost for given usage.
    ///
    /// Fails if a price is negative or not finite, or if the total overflows.
    pub fn cost(&self, usage: &Usage) -> Result<Cost, Error> {
        let input = checked_price("input", self.input_price)?;
        let output = checked_price("output", self.output_price)?;
        let cache_write = checked_price("cache write", self.cache_writes_price.unwrap_or(0.0))?;
        let cache_read = checked_price("cache read", self.cache_reads_price.unwrap_or(0.0))?;

        let cost = Cost {
            input_cost: f64::from(usage.input_tokens) * input,
            output_cost: f64::from(usage.output_tokens) * output,
            cache_write_cost: f64::from(usage.cache_write_tokens) * cache_write,
            cache_read_cost: f64::from(usage.cache_read_tokens) * cache_read,
        };

        if !cost.total().is_finite() {
            return Err(Error::Cost(format!("non-finite total for {usage:?}")));
        }
        Ok(cost)
    }
}

fn checked_price(name: &str, price: f64) -> Result<f64, Error> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(Error::Cost(format!("invalid {name} price: {price}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(input: u32, output: u32, write: u32, read: u32) -> Usage {
        Usage {
            input_tokens: input,
            output_tokens: output,
            cache_write_tokens: write,
            cache_read_tokens: read,
        }
    }

    #[test]
    fn test_cost_calculation() {
        let model = ModelDescriptor::new(10, 100, 1.0, 2.0);
        let cost = model.cost(&usage(3, 4, 0, 0)).unwrap();
        assert!((cost.input_cost - 3.0).abs() < 1e-10);
        assert!((cost.output_cost - 8.0).abs() < 1e-10);
        assert!((cost.total() - 11.0).abs() < 1e-10);
    }

    #[test]
    fn test_cache_cost() {
        let model = ModelDescriptor::new(10, 100, 1.0, 2.0).with_cache(0.5, 0.25);
        let cost = model.cost(&usage(0, 0, 4, 8)).unwrap();
        assert!((cost.cache_write_cost - 2.0).abs() < 1e-10);
        assert!((cost.cache_read_cost - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_missing_cache_prices_count_as_zero() {
        let model = ModelDescriptor::new(10, 100, 1.0, 2.0);
        let cost = model.cost(&usage(0, 0, 1000, 1000)).unwrap();
        assert_eq!(cost.total(), 0.0);
    }

    #[test]
    fn test_zero_usage_is_free() {
        let model = ModelDescriptor::new(10, 100, 3.0, 15.0).with_cache(3.75, 0.3);
        assert_eq!(model.cost(&Usage::default()).unwrap().total(), 0.0);
    }

    #[test]
    fn test_linear_in_each_counter() {
        let model = ModelDescriptor::new(10, 100, 1.5, 2.5).with_cache(0.75, 0.125);
        let base = usage(10, 20, 30, 40);
        let base_cost = model.cost(&base).unwrap();

        let doubled = [
            usage(20, 20, 30, 40),
            usage(10, 40, 30, 40),
            usage(10, 20, 60, 40),
            usage(10, 20, 30, 80),
        ];
        let contribution = [
            base_cost.input_cost,
            base_cost.output_cost,
            base_cost.cache_write_cost,
            base_cost.cache_read_cost,
        ];

        for (u, part) in doubled.iter().zip(contribution) {
            let cost = model.cost(u).unwrap();
            assert!((cost.total() - (base_cost.total() + part)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_prices() {
        let negative = ModelDescriptor::new(10, 100, -1.0, 2.0);
        assert!(matches!(negative.cost(&usage(1, 1, 0, 0)), Err(Error::Cost(_))));

        let nan = ModelDescriptor::new(10, 100, 1.0, f64::NAN);
        assert!(matches!(nan.cost(&usage(1, 1, 0, 0)), Err(Error::Cost(_))));

        let overflow = ModelDescriptor::new(10, 100, f64::MAX, f64::MAX);
        assert!(matches!(overflow.cost(&usage(u32::MAX, u32::MAX, 0, 0)), Err(Error::Cost(_))));
    }
}
