// ============================================================
// Layer 4 - Stratified Train/Test Splitter
// ============================================================
// Splits row indices into two sets:
//   - Training set: used to fit every candidate model
//   - Test set:     held out, used to score and pick the winner
//
// Why stratify?
//   The label is imbalanced (far fewer positive cases). A plain
//   random split can leave the test set with too few positives
//   to measure anything. Splitting each class separately keeps
//   the class proportions the same on both sides.
//
// Why a fixed seed?
//   The same input must give the same split, and therefore the
//   same fitted models, on every run. All randomness comes from
//   one `StdRng` seeded once and consumed in a fixed order.
//
// Split ratio: 80% training, 20% test (configurable)
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use std::collections::BTreeMap;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Stratified split of `labels` into (train indices, test indices).
///
/// # Arguments
/// * `labels`        - Class label of every row
/// * `test_fraction` - Proportion held out per class, e.g. 0.2 = 20%
/// * `seed`          - RNG seed; equal seeds give equal splits
///
/// # Example
/// ```ignore
/// let (train, test) = stratified_split(&labels, 0.2, 42);
/// ```
pub fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);

    // Group row indices per class, classes in ascending order
    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut test  = Vec::with_capacity(labels.len());

    for (_, mut indices) in by_class {
        indices.shuffle(&mut rng);

        // e.g. 1000 positives * 0.2 → last 200 are held out
        let n_test = ((indices.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test.min(indices.len());

        let held_out = indices.split_off(indices.len() - n_test);
        train.extend(indices);
        test.extend(held_out);
    }

    // Interleave the classes so neither side is ordered by label
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    tracing::debug!(
        "Stratified split: {} train, {} test ({}% / {}%)",
        train.len(),
        test.len(),
        (train.len() * 100) / labels.len().max(1),
        (test.len()  * 100) / labels.len().max(1),
    );

    (train, test)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced(n_neg: usize, n_pos: usize) -> Vec<u8> {
        let mut labels = vec![0u8; n_neg];
        labels.extend(std::iter::repeat(1u8).take(n_pos));
        labels
    }

    #[test]
    fn test_correct_split_sizes() {
        let labels        = imbalanced(90, 10);
        let (train, test) = stratified_split(&labels, 0.2, 42);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(),  20);
    }

    #[test]
    fn test_class_proportions_preserved() {
        let labels        = imbalanced(900, 100);
        let (train, test) = stratified_split(&labels, 0.2, 42);
        let pos = |idx: &[usize]| idx.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(pos(&test),  20);
        assert_eq!(pos(&train), 80);
    }

    #[test]
    fn test_all_items_preserved() {
        // No row lost or duplicated
        let labels = imbalanced(37, 13);
        let (train, test) = stratified_split(&labels, 0.3, 7);
        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let labels = imbalanced(500, 60);
        assert_eq!(stratified_split(&labels, 0.2, 42), stratified_split(&labels, 0.2, 42));
        assert_ne!(stratified_split(&labels, 0.2, 42), stratified_split(&labels, 0.2, 43));
    }

    #[test]
    fn test_empty_dataset() {
        let (train, test) = stratified_split(&[], 0.2, 42);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }
}
