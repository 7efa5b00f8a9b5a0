/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! Standalone driver for the bbsched instruction scheduler: runs one of
//! the named test regions and prints the resulting schedule.

mod test_cases;
mod test_framework;

use bbsched::{
  cycle_of, schedule_region, GraphTransType, Schedule, SchedulerOptions,
  SpillCostFunc,
};
use crate::test_cases::find_case;

use clap;
use log::{error, info};
use pretty_env_logger;

//=============================================================================
// Top level

fn main() {
  pretty_env_logger::init();

  let app = clap::App::new("minisched")
    .about("a driver for separate testing of the bbsched library")
    .arg(
      clap::Arg::with_name("test")
        .short("t")
        .takes_value(true)
        .required(true)
        .help("test case name"),
    )
    .arg(
      clap::Arg::with_name("scf")
        .short("c")
        .takes_value(true)
        .possible_values(&["perp", "sum", "peak", "peak-plus-avg"])
        .help("spill cost function (default perp)"),
    )
    .arg(
      clap::Arg::with_name("trans")
        .short("g")
        .takes_value(true)
        .multiple(true)
        .help("graph transformations to apply, in order"),
    )
    .arg(
      clap::Arg::with_name("timeout")
        .short("T")
        .takes_value(true)
        .help("region timeout in milliseconds (0 = none)"),
    )
    .arg(
      clap::Arg::with_name("no-stalls")
        .long("no-stalls")
        .help("do not enumerate schedules containing stalls"),
    );
  let matches = app.get_matches();

  let case_name = matches.value_of("test").unwrap();
  let case = match find_case(case_name) {
    Ok(case) => case,
    Err(available) => {
      error!("can't find a test case named '{}'", case_name);
      println!("available case names are:");
      for name in available {
        println!("     {}", name);
      }
      return;
    }
  };

  let mut opts = SchedulerOptions::default();
  if let Some(scf) = matches.value_of("scf") {
    opts.spill_cost_func = SpillCostFunc::from_name(scf).unwrap();
  }
  if let Some(names) = matches.values_of("trans") {
    for name in names {
      match GraphTransType::from_name(name) {
        Ok(t) => opts.graph_trans.push(t),
        Err(e) => {
          error!("{}", e);
          return;
        }
      }
    }
  }
  if let Some(ms) = matches.value_of("timeout") {
    opts.region_timeout_ms = ms.parse().unwrap_or(0);
  }
  if matches.is_present("no-stalls") {
    opts.enumerate_stalls = false;
  }

  let mut ddg = case.ddg;
  match schedule_region(&mut ddg, &case.mm, &opts, None) {
    Ok(sched) => {
      info!("scheduled '{}'", case_name);
      print_sched(&ddg, &case.mm, &sched);
    }
    Err(e) => error!("scheduling failed: {}", e),
  }
}

fn print_sched(
  ddg: &bbsched::DataDepGraph, mm: &bbsched::MachineModel, sched: &Schedule,
) {
  println!(
    "length {} cycles, cost {}, peak spill {}, spill sum {}, optimal: {}",
    sched.lngth,
    sched.cost,
    sched.peak_spill_cost,
    sched.spill_cost_sum,
    sched.is_optml
  );
  for ix in sched.order() {
    println!(
      "  cycle {:>3}  {}",
      cycle_of(sched.times[ix], mm.issue_rate()),
      ddg.inst(ix).name
    );
  }
}

//=============================================================================
// Tests.  These drive whole regions through the public API; the library's
// own modules carry the unit tests.

#[cfg(test)]
mod test_utils {
  use super::*;
  use bbsched::{
    cmput_sched_cost, cmput_sched_lwr_bound, schdul_hurstc, InstCount,
  };
  use crate::test_cases::TestCase;

  pub fn run_case(name: &str, opts: &SchedulerOptions) -> (TestCase, Schedule) {
    let _ = pretty_env_logger::try_init();
    let mut case = find_case(name).unwrap();
    let sched = schedule_region(&mut case.ddg, &case.mm, opts, None)
      .unwrap_or_else(|e| panic!("scheduling failed: {}", e));
    (case, sched)
  }

  /// The heuristic schedule's cost under the same options, for comparisons.
  pub fn hurstc_cost(case: &TestCase, opts: &SchedulerOptions) -> InstCount {
    let lb = cmput_sched_lwr_bound(&case.ddg, &case.mm, opts.lower_bound_alg);
    let times = schdul_hurstc(&case.ddg, &case.mm, &opts.hurstc_prirts);
    let (_, cost, _, _) =
      cmput_sched_cost(&case.ddg, &case.mm, opts, &times, lb);
    cost
  }
}

#[test]
fn bb_single() {
  let opts = SchedulerOptions::default();
  let (case, sched) = test_utils::run_case("single", &opts);
  assert_eq!(sched.lngth, 1);
  assert_eq!(sched.cost, 0);
  assert!(sched.is_optml);
  assert_eq!(cycle_of(sched.times[bbsched::mkInstIx(0)],
                      case.mm.issue_rate()), 0);
}

#[test]
fn bb_two_indep_r2() {
  let opts = SchedulerOptions::default();
  let (case, sched) = test_utils::run_case("two-indep-r2", &opts);
  assert_eq!(sched.lngth, 1);
  assert!(sched.is_optml);
  // Both issue in cycle 0, in either order.
  for n in 0..2 {
    let ix = bbsched::mkInstIx(n);
    assert_eq!(cycle_of(sched.times[ix], case.mm.issue_rate()), 0);
  }
}

#[test]
fn bb_latency_chain() {
  let opts = SchedulerOptions::default();
  let (case, sched) = test_utils::run_case("latency-chain", &opts);
  assert_eq!(sched.lngth, 4);
  assert_eq!(sched.cost, 0);
  assert!(sched.is_optml);
  let r = case.mm.issue_rate();
  assert_eq!(cycle_of(sched.times[bbsched::mkInstIx(0)], r), 0);
  assert_eq!(cycle_of(sched.times[bbsched::mkInstIx(1)], r), 3);
}

#[test]
fn bb_unpipelined_three() {
  let opts = SchedulerOptions::default();
  let (case, sched) = test_utils::run_case("unpipelined-three", &opts);
  // Issues two cycles apart; the last divide holds its unit through
  // cycle 5.
  assert_eq!(sched.lngth, 6);
  assert!(sched.is_optml);
  let r = case.mm.issue_rate();
  let mut cycles: Vec<_> = (0..3)
    .map(|n| cycle_of(sched.times[bbsched::mkInstIx(n)], r))
    .collect();
  cycles.sort_unstable();
  assert_eq!(cycles, vec![0, 2, 4]);
}

#[test]
fn bb_pressure_spill() {
  let mut opts = SchedulerOptions::default();
  opts.spill_cost_func = SpillCostFunc::Peak;
  let (case, sched) = test_utils::run_case("pressure-spill", &opts);
  // The heuristic issues both definers back to back and pays for it; the
  // enumerator interleaves definers and users.
  assert!(test_utils::hurstc_cost(&case, &opts) > 0);
  assert_eq!(sched.cost, 0);
  assert_eq!(sched.peak_spill_cost, 0);
  assert!(sched.is_optml);
}

#[test]
fn bb_blocked_cycle() {
  let opts = SchedulerOptions::default();
  let (case, sched) = test_utils::run_case("blocked-cycle", &opts);
  assert_eq!(sched.lngth, 2);
  assert!(sched.is_optml);
  // The barrier shares its cycle with nothing.
  let r = case.mm.issue_rate();
  let bcy = cycle_of(sched.times[bbsched::mkInstIx(0)], r);
  for n in 1..3 {
    assert_ne!(cycle_of(sched.times[bbsched::mkInstIx(n)], r), bcy);
  }
}

#[test]
fn bb_equiv_pair_trans_shrinks_search() {
  use bbsched::{cmput_sched_lwr_bound, Enumerator};
  let _ = pretty_env_logger::try_init();
  let opts = SchedulerOptions::default();

  let run = |apply_trans: bool| {
    let mut case = find_case("equiv-pair").unwrap();
    let mut added = 0;
    if apply_trans {
      added = bbsched::apply_graph_trans(
        GraphTransType::EquivDect,
        &mut case.ddg,
      )
      .unwrap();
    }
    let lb = cmput_sched_lwr_bound(&case.ddg, &case.mm, opts.lower_bound_alg);
    let mut enumrtr =
      Enumerator::new(&case.ddg, &case.mm, &opts, lb, lb, 100, 100);
    let res = enumrtr.enumerate(None).unwrap();
    let best = res.best.expect("a schedule must be found");
    (added, best.cost, enumrtr.stats().nodes_crtd)
  };

  let (_, cost_plain, nodes_plain) = run(false);
  let (added, cost_trans, nodes_trans) = run(true);
  assert_eq!(added, 1);
  assert_eq!(cost_plain, cost_trans);
  assert!(nodes_trans < nodes_plain);
}

#[test]
fn bb_dominance_prune() {
  use bbsched::{cmput_sched_lwr_bound, Enumerator};
  let _ = pretty_env_logger::try_init();
  let opts = SchedulerOptions::default();
  let case = find_case("dominance-diamond").unwrap();
  let lb = cmput_sched_lwr_bound(&case.ddg, &case.mm, opts.lower_bound_alg);
  assert_eq!(lb, 3);

  let mut enumrtr =
    Enumerator::new(&case.ddg, &case.mm, &opts, lb, lb, 100, 100);
  let res = enumrtr.enumerate(None).unwrap();
  assert_eq!(res.best.unwrap().cost, 1);

  // Both interleavings of the two sources reach {i0, i1}; the second hits
  // the history table and the sub-problem below it runs exactly once.
  let stats = enumrtr.stats();
  assert_eq!(stats.feasible_scheds, 1);
  assert_eq!(stats.hist_prunes, 1);
  assert_eq!(stats.nodes_crtd, 5);
}

#[test]
fn bb_round_trip_size_skip() {
  use bbsched::schdul_hurstc;
  let _ = pretty_env_logger::try_init();
  let mut opts = SchedulerOptions::default();
  opts.max_dag_size = 0;
  let mut case = find_case("eight-mixed").unwrap();
  let expctd = schdul_hurstc(&case.ddg, &case.mm, &opts.hurstc_prirts);
  let sched =
    schedule_region(&mut case.ddg, &case.mm, &opts, None).unwrap();
  assert!(!sched.is_optml);
  for ix in case.ddg.real_insts() {
    assert_eq!(sched.times[ix], expctd[ix]);
  }
}

#[test]
fn bb_eight_mixed() {
  let opts = SchedulerOptions::default();
  let (case, sched) = test_utils::run_case("eight-mixed", &opts);
  assert!(sched.is_optml);
  assert!(sched.cost <= test_utils::hurstc_cost(&case, &opts));
}

#[test]
fn bb_random_matches_brute_force() {
  use crate::test_framework::{
    brute_force_min_lngth, make_model, random_dag, Lcg,
  };
  let _ = pretty_env_logger::try_init();
  let opts = SchedulerOptions::default();

  for seed in 0..24u64 {
    let issue_rate = 1 + (seed % 2) as i32;
    let n = 2 + (seed % 6) as usize;
    let mm = make_model(issue_rate, 4);
    let mut lcg = Lcg::new(seed);
    let mut ddg = random_dag(&mm, &mut lcg, n, 3);

    let brute = brute_force_min_lngth(&mm, &ddg);
    let sched = schedule_region(&mut ddg, &mm, &opts, None).unwrap();
    assert!(sched.is_optml, "seed {} did not complete", seed);
    assert_eq!(
      sched.lngth, brute,
      "seed {}: enumerator found {} but brute force found {}",
      seed, sched.lngth, brute
    );
  }
}

#[test]
fn bb_timeout_returns_valid_incumbent() {
  let _ = pretty_env_logger::try_init();
  let mut opts = SchedulerOptions::default();
  opts.region_timeout_ms = 1;
  let mut case = find_case("eight-mixed").unwrap();
  let hurstc = test_utils::hurstc_cost(&case, &opts);
  let sched =
    schedule_region(&mut case.ddg, &case.mm, &opts, None).unwrap();
  // Whatever the clock did, the result is never worse than the heuristic.
  assert!(sched.cost <= hurstc);
}
