//! Unguessable names for scratch scripts uploaded to the webroot.

use rand::Rng;
use rand::distr::Alphanumeric;
use wpzip_core::NameGenerator;

const TOKEN_LEN: usize = 10;

/// Thread-local CSPRNG alphanumeric tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNames;

impl NameGenerator for RandomNames {
    fn token(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect()
    }
}
