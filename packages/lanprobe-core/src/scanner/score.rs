//! Confidence scoring from evidence density.

use super::host::DiscoveredHost;

const BASE_SCORE: u8 = 40;
const MAC_WEIGHT: u8 = 20;
const HOSTNAME_WEIGHT: u8 = 15;
const MANUFACTURER_WEIGHT: u8 = 15;
const MAX_SCORE: u8 = 100;

/// Score 0-100 from which identity fields are known.
pub fn confidence(has_mac: bool, has_hostname: bool, has_manufacturer: bool) -> u8 {
    let mut score = BASE_SCORE;
    if has_mac {
        score += MAC_WEIGHT;
    }
    if has_hostname {
        score += HOSTNAME_WEIGHT;
    }
    if has_manufacturer {
        score += MANUFACTURER_WEIGHT;
    }
    score.min(MAX_SCORE)
}

pub fn score_host(host: &DiscoveredHost) -> u8 {
    confidence(
        host.mac.is_some(),
        host.hostname.is_some(),
        host.manufacturer.is_some(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_and_strict_increase() {
        for bits in 0u8..8 {
            let (mac, host, vendor) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            let score = confidence(mac, host, vendor);
            assert!((40..=100).contains(&score));

            // Adding any absent field must raise the score.
            if !mac {
                assert!(confidence(true, host, vendor) > score);
            }
            if !host {
                assert!(confidence(mac, true, vendor) > score);
            }
            if !vendor {
                assert!(confidence(mac, host, true) > score);
            }
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(confidence(false, false, false), 40);
        assert_eq!(confidence(true, false, false), 60);
        assert_eq!(confidence(true, true, true), 90);
    }
}
