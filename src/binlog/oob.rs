//! Out-of-band (OOB) event data.
//!
//! Event groups too large to keep in memory until commit are written ahead
//! of their commit record as OOB nodes. The nodes form a forest of perfect
//! binary trees: a new node either becomes the root over the two most recent
//! trees (when they have the same height), or starts a new single-node tree
//! whose right link points back at the previous tree's root. The commit
//! record references the root of the last tree.
//!
//! Each node is an OOB_DATA record starting with five compressed integers,
//! `index left_file left_offset right_file right_offset`, followed by its
//! share of the event data. Reading the data back in write order is a
//! post-order walk: left subtree, right subtree, node. For the leftmost leaf
//! of a tree, the right link leads to the prior tree, which comes first.

use tracing::trace;

use crate::binlog::chunk::{ChunkReader, HeaderBuf, Location, SavedPosition};
use crate::binlog::constants::FSP_BINLOG_TYPE_OOB_DATA;
use crate::IbbError;

enum NodeState {
    /// Not visited yet; the node header has not been read.
    Initial,
    /// Leftmost leaf, waiting for the prior trees of the forest.
    PriorTrees {
        header: HeaderBuf,
        saved: SavedPosition,
    },
    /// Inner node, waiting for its left subtree.
    LeftChild {
        header: HeaderBuf,
        saved: SavedPosition,
        right: Location,
    },
    /// Inner node, waiting for its right subtree.
    RightChild {
        header: HeaderBuf,
        saved: SavedPosition,
    },
    /// Children done; handing out the node's own data.
    Emit { header: HeaderBuf },
}

struct Frame {
    node: Location,
    /// Reached from the root through left links only.
    is_leftmost: bool,
    state: NodeState,
}

/// Incremental post-order walk over an OOB forest.
///
/// The walk runs as an explicit stack of pending nodes, so data is produced
/// a buffer at a time without recursion.
#[derive(Default)]
pub struct OobReader {
    stack: Vec<Frame>,
}

impl OobReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a walk from the root of the last tree of a forest.
    pub fn start_traversal(&mut self, root: Location) {
        trace!(file_no = root.file_no, offset = root.offset, "Starting OOB traversal");
        self.stack.clear();
        self.push(root, true);
    }

    /// True once every node of the forest has been handed out.
    pub fn traversal_done(&self) -> bool {
        self.stack.is_empty()
    }

    fn push(&mut self, node: Location, is_leftmost: bool) {
        self.stack.push(Frame {
            node,
            is_leftmost,
            state: NodeState::Initial,
        });
    }

    /// Read the next OOB data into `buf`.
    ///
    /// Returns at most what is left of the current node on the current page,
    /// so the caller may get less than it asked for. Returns 0 only when the
    /// walk is done (or `buf` is empty).
    pub fn read(&mut self, chunk_rd: &mut ChunkReader, buf: &mut [u8]) -> Result<usize, IbbError> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let Some(frame) = self.stack.last_mut() else {
                return Ok(0);
            };

            match std::mem::replace(&mut frame.state, NodeState::Initial) {
                NodeState::Initial => {
                    let node = frame.node;
                    chunk_rd.seek(node.file_no, node.offset)?;
                    let mut header = HeaderBuf::fill(chunk_rd)?;
                    if chunk_rd.cur_type() != FSP_BINLOG_TYPE_OOB_DATA {
                        return Err(chunk_rd.corruption("Wrong chunk type"));
                    }
                    if header.is_empty() {
                        return Err(chunk_rd.corruption("Unexpected EOF, expected oob chunk"));
                    }

                    let _index = header.next_int(chunk_rd)?;
                    let left = Location::new(header.next_int(chunk_rd)?, header.next_int(chunk_rd)?);
                    let right = Location::new(header.next_int(chunk_rd)?, header.next_int(chunk_rd)?);
                    trace!(
                        file_no = node.file_no,
                        offset = node.offset,
                        left_file_no = left.file_no,
                        left_offset = left.offset,
                        right_file_no = right.file_no,
                        right_offset = right.offset,
                        "Visiting OOB node"
                    );

                    // Children and prior trees are always written before the node.
                    if (!left.is_null() && left >= node) || (!right.is_null() && right >= node) {
                        return Err(chunk_rd.corruption("Invalid oob node link"));
                    }

                    let is_leftmost = frame.is_leftmost;
                    if left.is_null() {
                        if is_leftmost && !right.is_null() {
                            frame.state = NodeState::PriorTrees {
                                header,
                                saved: chunk_rd.save_pos(),
                            };
                            self.push(right, true);
                        } else {
                            frame.state = NodeState::Emit { header };
                        }
                    } else {
                        frame.state = NodeState::LeftChild {
                            header,
                            saved: chunk_rd.save_pos(),
                            right,
                        };
                        self.push(left, is_leftmost);
                    }
                }

                NodeState::PriorTrees { header, saved } => {
                    chunk_rd.restore_pos(&saved);
                    frame.state = NodeState::Emit { header };
                }

                NodeState::LeftChild { header, saved, right } => {
                    frame.state = NodeState::RightChild { header, saved };
                    self.push(right, false);
                }

                NodeState::RightChild { header, saved } => {
                    chunk_rd.restore_pos(&saved);
                    frame.state = NodeState::Emit { header };
                }

                NodeState::Emit { mut header } => {
                    let mut size = header.drain(buf);
                    if size < buf.len() && !chunk_rd.end_of_record() {
                        let n = chunk_rd.read(&mut buf[size..], false)?;
                        if n == 0 && !chunk_rd.end_of_record() {
                            return Err(chunk_rd.corruption("Unexpected EOF, expected oob chunk"));
                        }
                        size += n;
                    }

                    if header.remaining() == 0 && chunk_rd.end_of_record() {
                        self.stack.pop();
                    } else {
                        frame.state = NodeState::Emit { header };
                    }

                    if size > 0 {
                        return Ok(size);
                    }
                }
            }
        }
    }
}
