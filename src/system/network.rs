//! Network domains.

use crate::types::{DataSize, Seconds};

/// A network domain: a set of computational layers that can exchange data at
/// a given access delay and bandwidth.
#[derive(Clone, Debug)]
pub struct NetworkDomain {
    /// Domain name.
    pub name: String,
    /// Names of the member computational layers.
    pub layers: Vec<String>,
    /// Fixed delay paid by every transfer through this domain.
    pub access_delay: Seconds,
    /// Bandwidth of the domain.
    pub bandwidth: f64,
}

impl NetworkDomain {
    /// Time to move `data_size` through this domain.
    ///
    /// Symmetric in the endpoints: the direction of a transfer never matters.
    #[must_use]
    pub fn transfer_time(&self, data_size: DataSize) -> Seconds {
        self.access_delay + data_size / self.bandwidth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_time_is_delay_plus_serialisation() {
        let domain = NetworkDomain {
            name: "lan".into(),
            layers: vec!["cl1".into(), "cl2".into()],
            access_delay: 0.01,
            bandwidth: 10.0,
        };
        assert!((domain.transfer_time(1.0) - 0.11).abs() < 1e-15);
        assert_eq!(domain.transfer_time(0.0), 0.01);
    }
}
