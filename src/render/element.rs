const NODE_TAG: u64 = 0;
const TREE_LINK_TAG: u64 = 1;
const NONTREE_LINK_TAG: u64 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphElement {
    Node(usize),
    TreeLink(usize),
    NontreeLink(usize),
}

impl GraphElement {
    pub fn pack(self) -> u64 {
        let (tag, id) = match self {
            Self::Node(id) => (NODE_TAG, id),
            Self::TreeLink(id) => (TREE_LINK_TAG, id),
            Self::NontreeLink(id) => (NONTREE_LINK_TAG, id),
        };
        debug_assert!(id <= u32::MAX as usize, "element id {id} does not fit in 32 bits");
        (tag << 32) | (id as u64 & 0xffff_ffff)
    }

    pub fn unpack(data: u64) -> Self {
        let id = (data & 0xffff_ffff) as usize;
        match data >> 32 {
            NODE_TAG => Self::Node(id),
            TREE_LINK_TAG => Self::TreeLink(id),
            NONTREE_LINK_TAG => Self::NontreeLink(id),
            tag => panic!("graph element tag {tag} is outside 0..=2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_tag_into_the_high_word() {
        assert_eq!(GraphElement::Node(7).pack(), 7);
        assert_eq!(GraphElement::TreeLink(7).pack(), (1 << 32) | 7);
        assert_eq!(GraphElement::NontreeLink(0).pack(), 2 << 32);
        assert_eq!(
            GraphElement::unpack((2 << 32) | 0xffff_ffff),
            GraphElement::NontreeLink(0xffff_ffff)
        );
    }

    #[test]
    #[should_panic(expected = "outside 0..=2")]
    fn rejects_unknown_tags() {
        GraphElement::unpack(3 << 32);
    }
}
