//! # Tree Driver
//!
//! Owns one index file: the root-pointer header, recursive descent for
//! insert and search, and the stateful cursor behind `first`/`last`/
//! `next`/`prev`.
//!
//! ## Ascent by Key
//!
//! Interior slots never repeat the keys below them, so when a leaf is
//! exhausted the cursor climbs to the parent and re-locates the previous
//! key there: `locate` lands exactly on the first slot whose key is
//! greater, which is the next key in document order. `prev` mirrors this
//! with the largest-lesser scan.
//!
//! ## Cursor State
//!
//! The cursor is `(current node, current slot, previous key)` plus one
//! iteration offset into the current slot's value list. The list offset
//! lives here and not on the node: nodes are reloaded constantly during
//! traversal and a reloaded node is a fresh snapshot.

use eyre::{bail, ensure, Result};
use smallvec::SmallVec;

use super::node::{Node, NodeLayout};
use super::{value_list, KeyType, DEFAULT_ORDER, HEADER_LEN};
use crate::storage::{BlockFile, FileManager, INDEX_FILE_EXTENSION, INT64_LEN};

type KeyBuf = SmallVec<[u8; 32]>;

/// A payload yielded by the cursor together with the key it was filed
/// under (padded to the index key width).
pub type Entry = (i64, Vec<u8>);

#[derive(Debug)]
struct Cursor {
    node: Node,
    slot: isize,
    previous_key: Vec<u8>,
    /// Offset of the next value-list cell of the current slot; 0 when the
    /// slot's list is exhausted.
    value_cursor: u64,
    forward_done: bool,
    backward_done: bool,
}

impl Cursor {
    fn at(node: Node, slot: isize, value_cursor: u64) -> Self {
        Self {
            node,
            slot,
            previous_key: Vec::new(),
            value_cursor,
            forward_done: false,
            backward_done: false,
        }
    }
}

/// A persistent ordered index over one `.idx` file.
#[derive(Debug)]
pub struct Tree {
    file: BlockFile,
    name: String,
    layout: NodeLayout,
    key_type: KeyType,
    cursor: Option<Cursor>,
}

impl Tree {
    /// Opens the index named `name`, creating the file on first open. For
    /// integer keys the key width is forced to 8 regardless of `key_width`.
    pub fn open(
        files: &FileManager,
        name: &str,
        key_type: KeyType,
        key_width: usize,
    ) -> Result<Self> {
        Self::open_with_order(files, name, key_type, key_width, DEFAULT_ORDER)
    }

    /// As [`Tree::open`] with an explicit node order. The order is baked
    /// into the file layout: reopening an index with a different order
    /// misreads every node.
    pub fn open_with_order(
        files: &FileManager,
        name: &str,
        key_type: KeyType,
        key_width: usize,
        order: usize,
    ) -> Result<Self> {
        let key_width = match key_type {
            KeyType::Int => INT64_LEN,
            KeyType::Text => key_width,
        };
        ensure!(
            key_width > 0,
            "index '{}' requires a positive key width",
            name
        );
        ensure!(order >= 2, "index '{}' requires an order of at least 2", name);

        let file_name = format!("{name}{INDEX_FILE_EXTENSION}");
        let created = files.create_blank_if_absent(&file_name)?;
        let file = files.open_read_write(&file_name)?;

        let tree = Self {
            file,
            name: name.to_string(),
            layout: NodeLayout::new(key_width, order),
            key_type,
            cursor: None,
        };

        if created {
            tree.file.write_u64(0, HEADER_LEN as u64)?;
            let mut root = tree.blank_node(0);
            root.save(&tree.file, HEADER_LEN as u64)?;
        }

        Ok(tree)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn close(self) -> Result<()> {
        self.file.sync()
    }

    fn blank_node(&self, parent: u64) -> Node {
        Node::new(self.layout, self.key_type, parent)
    }

    fn root_offset(&self, op: &str) -> Result<u64> {
        match self.file.read_u64(0)? {
            Some(ptr) => Ok(ptr),
            None => bail!(
                "{}: cannot read root node pointer of index '{}', corrupt index file",
                op,
                self.name
            ),
        }
    }

    fn padded_key(&self, key: &[u8]) -> KeyBuf {
        let mut padded = KeyBuf::new();
        padded.resize(self.layout.key_width(), 0);
        let n = key.len().min(padded.len());
        padded[..n].copy_from_slice(&key[..n]);
        padded
    }

    /// Inserts a (key, payload) pair. The key is zero-padded or truncated
    /// to the index key width; an existing key gains the payload in its
    /// value list (duplicates of the same payload are dropped).
    pub fn insert(&mut self, key: &[u8], value: i64) -> Result<()> {
        let padded = self.padded_key(key);

        let root = self.root_offset("insert")?;
        let (mut node, _, _) = self.descend(root, &padded)?;
        node.insert(&self.file, &padded, value)
    }

    /// Descends from `ptr` toward `key`, returning the terminal node, the
    /// slot index within it, and whether the key was found there.
    fn descend(&self, mut ptr: u64, key: &[u8]) -> Result<(Node, usize, bool)> {
        loop {
            let mut node = self.blank_node(0);
            node.load(&self.file, ptr)?;

            let (idx, found) = node.locate(key);
            if found {
                return Ok((node, idx, true));
            }

            if idx == 0 {
                if node.left_child() != 0 {
                    ptr = node.left_child();
                    continue;
                }
                return Ok((node, idx, false));
            }

            if node.slot(idx - 1).right_child != 0 {
                ptr = node.slot(idx - 1).right_child;
                continue;
            }

            return Ok((node, idx, false));
        }
    }

    /// Positions the cursor at `key` (or where it would insert) and
    /// returns `(payload, key-at-slot, found)`. On a hit the key's first
    /// payload is consumed, so `next` continues with the second. On a
    /// miss the payload is 0 and nothing is consumed; the cursor remains
    /// valid input for `next`/`prev`.
    pub fn search(&mut self, key: &[u8]) -> Result<(i64, Vec<u8>, bool)> {
        let padded = self.padded_key(key);

        let root = self.root_offset("search")?;
        let (node, idx, found) = self.descend(root, &padded)?;

        let slot_key = node.slot(idx).key.clone();
        let list_head = node.slot(idx).list_head;
        let mut cursor = Cursor::at(node, idx as isize, list_head);

        if found {
            ensure!(list_head != 0, "missing mapping node, corrupt index");
            let (payload, next) = value_list::read_cell(&self.file, list_head)?;
            cursor.value_cursor = next;
            self.cursor = Some(cursor);
            return Ok((payload, slot_key, true));
        }

        self.cursor = Some(cursor);
        Ok((0, slot_key, false))
    }

    /// Positions the cursor on the smallest key and returns its first
    /// payload, or `None` for an empty tree.
    pub fn first(&mut self) -> Result<Option<Entry>> {
        let root = self.root_offset("first")?;

        let mut node = self.blank_node(0);
        node.load(&self.file, root)?;
        while node.left_child() != 0 {
            let left = node.left_child();
            node.load(&self.file, left)?;
        }

        let occupied = node.slot(0).occupied;
        let key = node.slot(0).key.clone();
        let head = node.slot(0).list_head;

        let mut cursor = Cursor::at(node, 0, head);
        if !occupied {
            self.cursor = Some(cursor);
            return Ok(None);
        }

        let (payload, next) = value_list::read_cell(&self.file, head)?;
        cursor.value_cursor = next;
        self.cursor = Some(cursor);
        Ok(Some((payload, key)))
    }

    /// Positions the cursor on the greatest key and returns its first
    /// payload, or `None` for an empty tree.
    pub fn last(&mut self) -> Result<Option<Entry>> {
        let root = self.root_offset("last")?;

        let mut node = self.blank_node(0);
        node.load(&self.file, root)?;
        loop {
            if node.is_root() && node.occupied_count() == 0 {
                break;
            }
            let last_idx = node.occupied_count() - 1;
            let child = node.slot(last_idx).right_child;
            if child == 0 {
                break;
            }
            node.load(&self.file, child)?;
        }

        let slot = node.occupied_count() as isize - 1;
        if slot < 0 {
            self.cursor = Some(Cursor::at(node, slot, 0));
            return Ok(None);
        }

        let key = node.slot(slot as usize).key.clone();
        let head = node.slot(slot as usize).list_head;
        let mut cursor = Cursor::at(node, slot, head);

        let (payload, next) = value_list::read_cell(&self.file, head)?;
        cursor.value_cursor = next;
        self.cursor = Some(cursor);
        Ok(Some((payload, key)))
    }

    /// Yields the next (key, payload) pair in document order, or `None`
    /// at the end of the tree. The end is sticky: further calls keep
    /// returning `None` without touching cursor state until the cursor is
    /// repositioned or moved backward.
    pub fn next(&mut self) -> Result<Option<Entry>> {
        loop {
            let Some(cursor) = self.cursor.as_mut() else {
                return Ok(None);
            };
            if cursor.forward_done || cursor.slot < 0 {
                return Ok(None);
            }

            let idx = cursor.slot as usize;
            cursor.previous_key = cursor.node.slot(idx).key.clone();

            if cursor.node.slot(idx).occupied && cursor.value_cursor != 0 {
                let (payload, next) = value_list::read_cell(&self.file, cursor.value_cursor)?;
                let key = cursor.node.slot(idx).key.clone();
                cursor.value_cursor = next;
                cursor.backward_done = false;
                return Ok(Some((payload, key)));
            }

            if self.advance_forward()? {
                self.cursor.as_mut().expect("cursor positioned").forward_done = true;
                return Ok(None);
            }

            let cursor = self.cursor.as_mut().expect("cursor positioned");
            let idx = cursor.slot as usize;
            cursor.value_cursor = cursor.node.slot(idx).list_head;
        }
    }

    /// Yields the previous (key, payload) pair, or `None` at the
    /// beginning of the tree (sticky, as [`Tree::next`]). Payloads within
    /// one key iterate in insertion order in both directions.
    pub fn prev(&mut self) -> Result<Option<Entry>> {
        loop {
            let Some(cursor) = self.cursor.as_mut() else {
                return Ok(None);
            };
            if cursor.backward_done || cursor.slot < 0 {
                return Ok(None);
            }

            let idx = cursor.slot as usize;
            cursor.previous_key = cursor.node.slot(idx).key.clone();

            if cursor.node.slot(idx).occupied && cursor.value_cursor != 0 {
                let (payload, next) = value_list::read_cell(&self.file, cursor.value_cursor)?;
                let key = cursor.node.slot(idx).key.clone();
                cursor.value_cursor = next;
                cursor.forward_done = false;
                return Ok(Some((payload, key)));
            }

            if self.advance_backward()? {
                self.cursor.as_mut().expect("cursor positioned").backward_done = true;
                return Ok(None);
            }

            let cursor = self.cursor.as_mut().expect("cursor positioned");
            let idx = cursor.slot as usize;
            cursor.value_cursor = cursor.node.slot(idx).list_head;
        }
    }

    /// Removing a key from the tree is not supported. Records disappear
    /// from view through the record-pointer deleted flag; their index
    /// entries stay behind and resolve to deleted rows that cursors skip.
    pub fn delete(&mut self, _key: &[u8]) -> Result<()> {
        bail!("index '{}' does not support key removal", self.name)
    }

    /// Moves the cursor to the next occupied slot in document order.
    /// Returns true at the end of the tree.
    fn advance_forward(&mut self) -> Result<bool> {
        loop {
            let file = &self.file;
            let cursor = self.cursor.as_mut().expect("cursor positioned");
            let node = &mut cursor.node;

            if node.is_leaf() {
                cursor.slot += 1;
                let idx = cursor.slot as usize;
                if idx < node.slot_count() && node.slot(idx).occupied {
                    return Ok(false);
                }
                if node.is_root() {
                    // Root and leaf at once: the whole tree is exhausted.
                    return Ok(true);
                }
                let parent = node.parent();
                node.load(file, parent)?;
                let (idx, _) = node.locate(&cursor.previous_key);
                cursor.slot = idx as isize;
                if node.slot(idx).occupied {
                    return Ok(false);
                }
                continue;
            }

            if cursor.slot == -1 {
                if node.left_child() != 0 {
                    let left = node.left_child();
                    node.load(file, left)?;
                    cursor.slot = -1;
                    continue;
                }
                cursor.slot = 0;
                return Ok(false);
            }

            let idx = cursor.slot as usize;
            if !node.slot(idx).occupied {
                if node.is_root() {
                    return Ok(true);
                }
                let parent = node.parent();
                node.load(file, parent)?;
                let (idx, _) = node.locate(&cursor.previous_key);
                cursor.slot = idx as isize;
                if node.slot(idx).occupied {
                    return Ok(false);
                }
                continue;
            }

            if node.slot(idx).right_child != 0 {
                let right = node.slot(idx).right_child;
                node.load(file, right)?;
                cursor.slot = -1;
                continue;
            }

            return Ok(true);
        }
    }

    /// Moves the cursor to the previous occupied slot. Returns true at
    /// the beginning of the tree.
    fn advance_backward(&mut self) -> Result<bool> {
        let mut ascending = false;
        loop {
            let file = &self.file;
            let cursor = self.cursor.as_mut().expect("cursor positioned");
            let node = &mut cursor.node;

            if cursor.slot == -1 && node.is_root() {
                return Ok(true);
            }

            cursor.slot = node.find_previous_by_key(&cursor.previous_key);

            if node.is_leaf() {
                if cursor.slot == -1 {
                    if node.is_root() {
                        return Ok(true);
                    }
                    let parent = node.parent();
                    node.load(file, parent)?;
                    let idx = node.find_previous_by_key(&cursor.previous_key);
                    if idx < 0 {
                        ascending = true;
                        continue;
                    }
                    cursor.slot = idx;
                }
                return Ok(false);
            }

            if cursor.slot < 0 {
                if node.left_child() != 0 && !ascending {
                    let left = node.left_child();
                    node.load(file, left)?;
                    continue;
                }
                if node.is_root() {
                    return Ok(true);
                }
                let parent = node.parent();
                node.load(file, parent)?;
                let idx = node.find_previous_by_key(&cursor.previous_key);
                if idx < 0 {
                    ascending = true;
                    continue;
                }
                cursor.slot = idx;
                return Ok(false);
            }

            let idx = cursor.slot as usize;
            if node.slot(idx).right_child != 0 {
                let right = node.slot(idx).right_child;
                node.load(file, right)?;
                cursor.slot = node.find_previous_by_key(&cursor.previous_key);
                ascending = false;
                continue;
            }

            return Ok(true);
        }
    }
}
