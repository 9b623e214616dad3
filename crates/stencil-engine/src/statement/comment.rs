use crate::block::Block;

/// `comment` ... `endComment`: drop the enclosed region.
#[derive(Debug)]
pub struct Comment<B> {
    block: B,
}

impl<B: Block> Comment<B> {
    pub fn new(block: B) -> Self {
        Self { block }
    }

    pub fn evaluate(&mut self) {
        self.block.replace(Vec::new());
    }

    pub fn into_block(self) -> B {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::testing::RecordingBlock;

    #[test]
    fn test_comment_clears_block() {
        let mut comment = Comment::new(RecordingBlock::new("comment", "note"));
        comment.evaluate();
        assert_eq!(comment.into_block().text().as_deref(), Some(""));
    }
}
