/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Named test regions.  The registry is at the bottom, in `find_case`.

use crate::test_framework::{build_dag, make_model, RegSpec};
use bbsched::{DataDepGraph, MachineModel};

pub struct TestCase {
  pub mm: MachineModel,
  pub ddg: DataDepGraph,
}

/// A single instruction.
fn single() -> TestCase {
  let mm = make_model(1, 4);
  let ddg = build_dag(&mm, &["Default"], &[], &[]);
  TestCase { mm, ddg }
}

/// Two independent instructions on a dual-issue machine.
fn two_indep_r2() -> TestCase {
  let mm = make_model(2, 4);
  let ddg = build_dag(&mm, &["Default", "Default"], &[], &[]);
  TestCase { mm, ddg }
}

/// A two-instruction chain with latency 3 on a single-issue machine.
fn latency_chain() -> TestCase {
  let mm = make_model(1, 4);
  let ddg =
    build_dag(&mm, &["lat3", "Default"], &[(0, 1, 3)], &[]);
  TestCase { mm, ddg }
}

/// Three independent unpipelined divides of latency 2, single issue.
fn unpipelined_three() -> TestCase {
  let mm = make_model(1, 4);
  let ddg = build_dag(&mm, &["div2", "div2", "div2"], &[], &[]);
  TestCase { mm, ddg }
}

/// A diamond whose two middle instructions are equivalent.
fn equiv_pair() -> TestCase {
  let mm = make_model(1, 1);
  let ddg = build_dag(
    &mm,
    &["Default", "Default", "Default", "Default"],
    &[(0, 1, 1), (0, 2, 1), (1, 3, 1), (2, 3, 1)],
    &[
      // The sink defines two registers against a limit of one, keeping the
      // optimal cost above zero so searches run to exhaustion.
      RegSpec { def: Some(3), uses: vec![], live_in: false, live_out: false },
      RegSpec { def: Some(3), uses: vec![], live_in: false, live_out: false },
    ],
  );
  TestCase { mm, ddg }
}

/// Two independent sources joined by a sink; the two interleavings of the
/// sources reach the same sub-problem.
fn dominance_diamond() -> TestCase {
  let mm = make_model(1, 1);
  let ddg = build_dag(
    &mm,
    &["Default", "Default", "Default"],
    &[(0, 2, 1), (1, 2, 1)],
    &[
      RegSpec { def: Some(2), uses: vec![], live_in: false, live_out: false },
      RegSpec { def: Some(2), uses: vec![], live_in: false, live_out: false },
    ],
  );
  TestCase { mm, ddg }
}

/// Two def/use pairs where issue order decides the register pressure:
/// interleaving the pairs keeps one value live at a time.
fn pressure_spill() -> TestCase {
  let mm = make_model(1, 1);
  let ddg = build_dag(
    &mm,
    &["Default", "Default", "Default", "Default"],
    &[(0, 2, 1), (1, 3, 1)],
    &[
      RegSpec { def: Some(0), uses: vec![2], live_in: false, live_out: false },
      RegSpec { def: Some(1), uses: vec![3], live_in: false, live_out: false },
    ],
  );
  TestCase { mm, ddg }
}

/// A cycle-blocking instruction among plain ones on a dual-issue machine.
fn blocked_cycle() -> TestCase {
  let mm = make_model(2, 4);
  let ddg =
    build_dag(&mm, &["barrier", "Default", "Default"], &[], &[]);
  TestCase { mm, ddg }
}

/// A slightly bigger mixed region for driver runs.
fn eight_mixed() -> TestCase {
  let mm = make_model(2, 2);
  let ddg = build_dag(
    &mm,
    &[
      "Default", "lat2", "Default", "lat3", "Default", "lat2", "Default",
      "Default",
    ],
    &[
      (0, 2, 1),
      (1, 4, 2),
      (2, 5, 1),
      (3, 6, 3),
      (4, 7, 1),
      (5, 7, 2),
    ],
    &[
      RegSpec { def: Some(0), uses: vec![2, 5], live_in: false,
                live_out: false },
      RegSpec { def: Some(1), uses: vec![4], live_in: false,
                live_out: false },
      RegSpec { def: Some(3), uses: vec![6], live_in: false,
                live_out: true },
      RegSpec { def: None, uses: vec![0, 1], live_in: true,
                live_out: false },
    ],
  );
  TestCase { mm, ddg }
}

pub const CASE_NAMES: &[&str] = &[
  "single",
  "two-indep-r2",
  "latency-chain",
  "unpipelined-three",
  "equiv-pair",
  "dominance-diamond",
  "pressure-spill",
  "blocked-cycle",
  "eight-mixed",
];

pub fn find_case(name: &str) -> Result<TestCase, &'static [&'static str]> {
  match name {
    "single" => Ok(single()),
    "two-indep-r2" => Ok(two_indep_r2()),
    "latency-chain" => Ok(latency_chain()),
    "unpipelined-three" => Ok(unpipelined_three()),
    "equiv-pair" => Ok(equiv_pair()),
    "dominance-diamond" => Ok(dominance_diamond()),
    "pressure-spill" => Ok(pressure_spill()),
    "blocked-cycle" => Ok(blocked_cycle()),
    "eight-mixed" => Ok(eight_mixed()),
    _ => Err(CASE_NAMES),
  }
}
