//! Huffman coding of the vocabulary.
//!
//! Hierarchical softmax predicts a word by a sequence of binary
//! decisions along the path from the root of a binary tree to the
//! word's leaf. Using a Huffman tree over the word frequencies gives
//! frequent words short paths.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Huffman code of a vocabulary entry.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Code {
    /// Branch taken at each internal node, `0` for left, `1` for right.
    pub bits: Vec<u8>,

    /// Internal nodes on the path from the root to the leaf.
    pub parents: Vec<usize>,
}

/// Node of the Huffman tree.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum HuffmanNode {
    /// A vocabulary entry.
    Leaf(usize),

    /// An internal node, numbered in creation order.
    Internal(usize),
}

/// Build a Huffman tree over the given counts and return the code of
/// every leaf.
///
/// The two nodes with the lowest counts are repeatedly merged into a new
/// internal node. Ties are broken by creation order: leaves are created
/// in index order before any internal node. Internal nodes are numbered
/// `0..counts.len() - 1`, the root is the last one.
///
/// A tree over fewer than two counts has no internal nodes, every leaf
/// then gets an empty code.
pub fn create_binary_tree(counts: &[u64]) -> Vec<Code> {
    let mut codes = vec![Code::default(); counts.len()];
    if counts.len() < 2 {
        return codes;
    }

    let mut heap = BinaryHeap::with_capacity(counts.len());
    for (idx, &count) in counts.iter().enumerate() {
        heap.push(Reverse((count, idx, HuffmanNode::Leaf(idx))));
    }

    let mut children = Vec::with_capacity(counts.len() - 1);
    while heap.len() > 1 {
        let Reverse((left_count, _, left)) = heap.pop().expect("Cannot pop from non-empty heap");
        let Reverse((right_count, _, right)) =
            heap.pop().expect("Cannot pop from non-empty heap");

        let internal = children.len();
        children.push((left, right));
        heap.push(Reverse((
            left_count + right_count,
            counts.len() + internal,
            HuffmanNode::Internal(internal),
        )));
    }

    let root = HuffmanNode::Internal(children.len() - 1);
    assign_codes(root, Vec::new(), Vec::new(), &children, &mut codes);

    codes
}

/// Walk the tree from `node`, extending the code and ancestor path.
fn assign_codes(
    node: HuffmanNode,
    bits: Vec<u8>,
    mut parents: Vec<usize>,
    children: &[(HuffmanNode, HuffmanNode)],
    codes: &mut [Code],
) {
    match node {
        HuffmanNode::Leaf(idx) => codes[idx] = Code { bits, parents },
        HuffmanNode::Internal(idx) => {
            parents.push(idx);
            let (left, right) = children[idx];

            let mut left_bits = bits.clone();
            left_bits.push(0);
            assign_codes(left, left_bits, parents.clone(), children, codes);

            let mut right_bits = bits;
            right_bits.push(1);
            assign_codes(right, right_bits, parents, children, codes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{create_binary_tree, Code};

    fn is_prefix(prefix: &[u8], code: &[u8]) -> bool {
        prefix.len() <= code.len() && &code[..prefix.len()] == prefix
    }

    #[test]
    fn tree_over_two_words() {
        let codes = create_binary_tree(&[10, 5]);
        // The least frequent node is popped first and becomes the left child.
        assert_eq!(
            codes,
            vec![
                Code {
                    bits: vec![1],
                    parents: vec![0]
                },
                Code {
                    bits: vec![0],
                    parents: vec![0]
                }
            ]
        );
    }

    #[test]
    fn tiny_vocabularies_have_empty_codes() {
        assert!(create_binary_tree(&[]).is_empty());
        assert_eq!(create_binary_tree(&[42]), vec![Code::default()]);
    }

    #[test]
    fn codes_are_prefix_free() {
        let counts = [100, 80, 80, 40, 21, 20, 7, 3, 3, 1, 1, 1];
        let codes = create_binary_tree(&counts);

        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert!(!is_prefix(&a.bits, &b.bits), "{:?} prefixes {:?}", a, b);
                }
            }
        }
    }

    #[test]
    fn paths_match_codes() {
        let counts = [50, 30, 20, 10, 5, 5, 2, 1];
        let codes = create_binary_tree(&counts);
        let root = counts.len() - 2;

        for code in &codes {
            assert_eq!(code.bits.len(), code.parents.len());
            assert_eq!(code.parents[0], root);
            assert!(code.parents.iter().all(|&p| p < counts.len() - 1));
        }
    }

    #[test]
    fn frequent_words_get_shorter_codes() {
        let counts = [1000, 500, 250, 120, 60, 30, 30, 15, 8, 4, 2, 1];
        let codes = create_binary_tree(&counts);

        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if counts[i] > counts[j] {
                    assert!(a.bits.len() <= b.bits.len());
                }
            }
        }
    }

    #[test]
    fn equal_counts_give_balanced_tree() {
        let codes = create_binary_tree(&[7; 8]);
        assert!(codes.iter().all(|code| code.bits.len() == 3));
    }

    #[test]
    fn construction_is_deterministic() {
        let counts = [9, 9, 4, 4, 4, 1, 1];
        assert_eq!(create_binary_tree(&counts), create_binary_tree(&counts));
    }
}
