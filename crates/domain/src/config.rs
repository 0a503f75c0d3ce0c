//! Tunables for the order service.

/// Order service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfig {
    /// Fail order creation when a product has no base price, instead of
    /// pricing it at zero.
    pub treat_missing_price_as_error: bool,

    /// How many times an operation is run when its commit loses a
    /// concurrency race. Values below 1 are treated as 1.
    pub max_commit_attempts: u32,

    /// Page size used when a list request does not give one.
    pub default_page_size: usize,

    /// Upper bound for requested page sizes.
    pub max_page_size: usize,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            treat_missing_price_as_error: false,
            max_commit_attempts: 3,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl OrderConfig {
    pub fn with_missing_price_as_error(mut self, enabled: bool) -> Self {
        self.treat_missing_price_as_error = enabled;
        self
    }

    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts;
        self
    }

    pub fn with_page_sizes(mut self, default_size: usize, max_size: usize) -> Self {
        self.default_page_size = default_size;
        self.max_page_size = max_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive() {
        let config = OrderConfig::default();
        assert!(!config.treat_missing_price_as_error);
        assert_eq!(config.max_commit_attempts, 3);
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.max_page_size, 100);
    }

    #[test]
    fn builders_override_fields() {
        let config = OrderConfig::default()
            .with_missing_price_as_error(true)
            .with_max_commit_attempts(5)
            .with_page_sizes(20, 50);
        assert!(config.treat_missing_price_as_error);
        assert_eq!(config.max_commit_attempts, 5);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_page_size, 50);
    }
}
