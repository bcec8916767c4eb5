//! Opinion Analysis
//!
//! Screen diversity entropy and summary statistics over opinion vectors.

use serde::Serialize;

use crate::agent::Agent;

/// Lower and upper bound of the opinion axis
pub const OPINION_RANGE: (f64, f64) = (-1.0, 1.0);

/// Shannon entropy (bits) of the screen's content histogram.
///
/// Contents are binned over the opinion range and every bin receives one
/// pseudo-count, so an empty screen scores `log2(bins)`.
pub fn screen_diversity(contents: &[f64], bins: usize) -> f64 {
    if bins == 0 {
        return 0.0;
    }
    let mut counts = vec![1.0f64; bins];
    let (lo, hi) = OPINION_RANGE;
    let width = (hi - lo) / bins as f64;

    for &value in contents {
        if !(lo..=hi).contains(&value) {
            continue;
        }
        // The upper edge belongs to the last bin
        let index = (((value - lo) / width) as usize).min(bins - 1);
        counts[index] += 1.0;
    }

    let total: f64 = counts.iter().sum();
    -counts
        .iter()
        .map(|&c| {
            let p = c / total;
            p * p.log2()
        })
        .sum::<f64>()
}

/// Summary of an opinion vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpinionSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Mean, population standard deviation and range; `None` for no opinions
pub fn summarize(opinions: &[f64]) -> Option<OpinionSummary> {
    if opinions.is_empty() {
        return None;
    }
    let n = opinions.len() as f64;
    let mean = opinions.iter().sum::<f64>() / n;
    let variance = opinions.iter().map(|o| (o - mean).powi(2)).sum::<f64>() / n;
    let min = opinions.iter().copied().fold(f64::INFINITY, f64::min);
    let max = opinions.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(OpinionSummary {
        mean,
        std_dev: variance.sqrt(),
        min,
        max,
    })
}

/// Discordant messages across every agent's last evaluated screen
pub fn total_discordant_messages(agents: &[Agent]) -> usize {
    agents.iter().map(|a| a.discordant().len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use echo_events::Message;

    #[test]
    fn test_empty_screen_is_maximally_diverse() {
        let h = screen_diversity(&[], 10);
        assert!((h - 10f64.log2()).abs() < 1e-12);
    }

    #[test]
    fn test_concentrated_screen_has_lower_entropy() {
        let uniform: Vec<f64> = (0..10).map(|i| -0.95 + 0.2 * i as f64).collect();
        let clustered = vec![0.5; 10];
        assert!(screen_diversity(&clustered, 10) < screen_diversity(&uniform, 10));
    }

    #[test]
    fn test_edges_and_out_of_range_values() {
        // 1.0 lands in the last bin; values outside the range are ignored
        let with_edge = screen_diversity(&[1.0], 2);
        let with_inner = screen_diversity(&[0.5], 2);
        assert!((with_edge - with_inner).abs() < 1e-12);

        let ignored = screen_diversity(&[3.0, -1.5], 4);
        assert!((ignored - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_total_discordant_messages() {
        let screen = [
            Message::original(0, 5, 0.9),
            Message::original(1, 6, -0.8),
            Message::original(2, 7, 0.1),
        ];
        let mut moderate = Agent::new(0, 0.0, 0.5, 0.2);
        let mut hawk = Agent::new(1, 0.8, 0.3, 0.2);
        moderate.evaluate_messages(&screen);
        hawk.evaluate_messages(&screen);

        // moderate rejects 0.9 and -0.8; hawk rejects -0.8 and 0.1
        assert_eq!(total_discordant_messages(&[moderate.clone(), hawk.clone()]), 4);
        assert_eq!(total_discordant_messages(&[hawk]), 2);
        assert_eq!(total_discordant_messages(&[]), 0);
    }

    #[test]
    fn test_summarize() {
        assert!(summarize(&[]).is_none());

        let s = summarize(&[-1.0, 1.0, 0.0, 0.0]).unwrap();
        assert_eq!(s.mean, 0.0);
        assert!((s.std_dev - 0.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.min, -1.0);
        assert_eq!(s.max, 1.0);
    }
}
