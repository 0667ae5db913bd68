//! Edge classification between two consecutive samples of an input line.

use crate::gpio::InputLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// High to Low: the trigger fired.
    Falling,
    /// Low to High: the trigger was released.
    Rising,
}

/// Returns the transition from `previous` to `current`, if any.
///
/// Holds no state of its own; the caller owns the previous sample.
pub fn detect_edge(previous: InputLevel, current: InputLevel) -> Option<Edge> {
    match (previous, current) {
        (InputLevel::High, InputLevel::Low) => Some(Edge::Falling),
        (InputLevel::Low, InputLevel::High) => Some(Edge::Rising),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::InputLevel::{High, Low};

    #[test]
    fn test_steady_levels_have_no_edge() {
        assert_eq!(detect_edge(High, High), None);
        assert_eq!(detect_edge(Low, Low), None);
    }

    #[test]
    fn test_transitions() {
        assert_eq!(detect_edge(High, Low), Some(Edge::Falling));
        assert_eq!(detect_edge(Low, High), Some(Edge::Rising));
    }

    #[test]
    fn test_sequence_fires_once_per_transition() {
        let samples = [High, High, Low, Low, High];
        let edges: Vec<Edge> = samples
            .windows(2)
            .filter_map(|w| detect_edge(w[0], w[1]))
            .collect();
        assert_eq!(edges, vec![Edge::Falling, Edge::Rising]);
    }
}
