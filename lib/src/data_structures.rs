/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Basic data structures for the scheduler: typed index vectors, the index
//! types themselves, and dense bit vectors over instruction numbers.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

//=============================================================================
// Scalar aliases

/// An instruction count, cycle number, or slot-clock value.  Signed, so that
/// `INVALID_VALUE` can serve as a sentinel.
pub type InstCount = i32;

pub const INVALID_VALUE: InstCount = -1;

/// Issue types, instruction types and register types are small dense indices
/// into the machine model.
pub type IssueType = u16;
pub type InstType = u16;
pub type RegType = u16;

/// The slot clock is 1-based: the enumeration root sits at time 0 and the
/// k-th issue step at time k, so the instruction issued at time t occupies
/// cycle (t-1)/R and slot (t-1) mod R.
pub fn cycle_of(time: InstCount, issue_rate: InstCount) -> InstCount {
  (time - 1) / issue_rate
}

pub fn slot_of(time: InstCount, issue_rate: InstCount) -> InstCount {
  (time - 1) % issue_rate
}

//=============================================================================
// Vectors where both the index and element types can be specified.  At most
// 2^32-1 elements can be stored.

pub struct TypedIxVec<TyIx, Ty> {
  vek: Vec<Ty>,
  ty_ix: PhantomData<TyIx>,
}

impl<TyIx, Ty> TypedIxVec<TyIx, Ty> {
  pub fn new() -> Self {
    Self { vek: Vec::new(), ty_ix: PhantomData }
  }
  pub fn from_vec(vek: Vec<Ty>) -> Self {
    Self { vek, ty_ix: PhantomData }
  }
  pub fn len(&self) -> u32 {
    self.vek.len() as u32
  }
  pub fn is_empty(&self) -> bool {
    self.vek.is_empty()
  }
  pub fn push(&mut self, item: Ty) {
    self.vek.push(item);
  }
  pub fn clear(&mut self) {
    self.vek.clear();
  }
  pub fn truncate(&mut self, new_len: u32) {
    self.vek.truncate(new_len as usize);
  }
  pub fn pop(&mut self) -> Option<Ty> {
    self.vek.pop()
  }
  pub fn iter(&self) -> std::slice::Iter<Ty> {
    self.vek.iter()
  }
  pub fn iter_mut(&mut self) -> std::slice::IterMut<Ty> {
    self.vek.iter_mut()
  }
  pub fn last(&self) -> Option<&Ty> {
    self.vek.last()
  }
}

impl<TyIx, Ty: Clone> TypedIxVec<TyIx, Ty> {
  pub fn resize(&mut self, new_len: u32, value: Ty) {
    self.vek.resize(new_len as usize, value);
  }
}

impl<TyIx: Into<u32>, Ty> Index<TyIx> for TypedIxVec<TyIx, Ty> {
  type Output = Ty;
  fn index(&self, ix: TyIx) -> &Ty {
    &self.vek[ix.into() as usize]
  }
}

impl<TyIx: Into<u32>, Ty> IndexMut<TyIx> for TypedIxVec<TyIx, Ty> {
  fn index_mut(&mut self, ix: TyIx) -> &mut Ty {
    &mut self.vek[ix.into() as usize]
  }
}

impl<TyIx, Ty: Clone> Clone for TypedIxVec<TyIx, Ty> {
  fn clone(&self) -> Self {
    Self { vek: self.vek.clone(), ty_ix: PhantomData }
  }
}

impl<TyIx, Ty: fmt::Debug> fmt::Debug for TypedIxVec<TyIx, Ty> {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    self.vek.fmt(fmt)
  }
}

//=============================================================================
// Index type boilerplate

macro_rules! generate_boilerplate {
  ($TypeIx:ident, $mkTypeIx:ident, $PrintingPrefix:expr) => {
    #[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
    pub struct $TypeIx(u32);

    #[allow(non_snake_case)]
    pub fn $mkTypeIx(n: u32) -> $TypeIx {
      $TypeIx(n)
    }

    impl $TypeIx {
      pub fn get(self) -> u32 {
        self.0
      }
      pub fn get_usize(self) -> usize {
        self.0 as usize
      }
      pub fn plus(self, delta: u32) -> $TypeIx {
        $TypeIx(self.0 + delta)
      }
    }

    impl Into<u32> for $TypeIx {
      fn into(self) -> u32 {
        self.0
      }
    }

    impl fmt::Debug for $TypeIx {
      fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}{}", $PrintingPrefix, self.0)
      }
    }
  };
}

generate_boilerplate!(InstIx, mkInstIx, "i");
generate_boilerplate!(RegIx, mkRegIx, "r");
generate_boilerplate!(EtnIx, mkEtnIx, "n");
generate_boilerplate!(HistIx, mkHistIx, "h");

//=============================================================================
// Dense bit vectors over a fixed universe, used for the recursive-neighbor
// relation and for scheduled-instruction sets.

#[derive(Clone, PartialEq, Eq)]
pub struct BitVec {
  univ_size: u32,
  words: Vec<u64>,
}

impl BitVec {
  pub fn new(univ_size: u32) -> Self {
    let n_words = ((univ_size as usize) + 63) / 64;
    Self { univ_size, words: vec![0u64; n_words] }
  }

  pub fn univ_size(&self) -> u32 {
    self.univ_size
  }

  pub fn reset(&mut self) {
    for w in self.words.iter_mut() {
      *w = 0;
    }
  }

  pub fn set(&mut self, ix: InstIx) {
    let n = ix.get();
    debug_assert!(n < self.univ_size);
    self.words[(n >> 6) as usize] |= 1u64 << (n & 63);
  }

  pub fn clear(&mut self, ix: InstIx) {
    let n = ix.get();
    debug_assert!(n < self.univ_size);
    self.words[(n >> 6) as usize] &= !(1u64 << (n & 63));
  }

  pub fn get(&self, ix: InstIx) -> bool {
    let n = ix.get();
    debug_assert!(n < self.univ_size);
    (self.words[(n >> 6) as usize] >> (n & 63)) & 1 != 0
  }

  pub fn one_cnt(&self) -> u32 {
    self.words.iter().map(|w| w.count_ones()).sum()
  }

  /// Word-wise union, used when building the transitive closure.
  pub fn union(&mut self, other: &BitVec) {
    debug_assert!(self.univ_size == other.univ_size);
    for (w, ow) in self.words.iter_mut().zip(other.words.iter()) {
      *w |= *ow;
    }
  }

  pub fn is_subset_of(&self, other: &BitVec) -> bool {
    debug_assert!(self.univ_size == other.univ_size);
    self
      .words
      .iter()
      .zip(other.words.iter())
      .all(|(w, ow)| *w & !*ow == 0)
  }

  pub fn words(&self) -> &[u64] {
    &self.words
  }
}

impl fmt::Debug for BitVec {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    let mut first = true;
    write!(fmt, "{{")?;
    for n in 0..self.univ_size {
      if self.get(mkInstIx(n)) {
        if !first {
          write!(fmt, ", ")?;
        }
        first = false;
        write!(fmt, "{}", n)?;
      }
    }
    write!(fmt, "}}")
  }
}

//=============================================================================

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_bitvec_basic() {
    let mut bv = BitVec::new(130);
    assert_eq!(bv.one_cnt(), 0);
    bv.set(mkInstIx(0));
    bv.set(mkInstIx(64));
    bv.set(mkInstIx(129));
    assert!(bv.get(mkInstIx(64)));
    assert!(!bv.get(mkInstIx(63)));
    assert_eq!(bv.one_cnt(), 3);
    bv.clear(mkInstIx(64));
    assert!(!bv.get(mkInstIx(64)));
    assert_eq!(bv.one_cnt(), 2);
  }

  #[test]
  fn test_bitvec_subset_union() {
    let mut a = BitVec::new(100);
    let mut b = BitVec::new(100);
    a.set(mkInstIx(3));
    a.set(mkInstIx(77));
    b.set(mkInstIx(3));
    b.set(mkInstIx(77));
    b.set(mkInstIx(99));
    assert!(a.is_subset_of(&b));
    assert!(!b.is_subset_of(&a));
    a.union(&b);
    assert!(b.is_subset_of(&a));
    assert_eq!(a, b);
  }
}
