/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! The machine model: issue rate, issue types with per-cycle slot counts,
//! register types with physical-register counts, and instruction types with
//! latency and pipelining information.  A pure value object once built.

use crate::data_structures::{InstCount, InstType, IssueType, RegType};
use crate::interface::SchedError;
use rustc_hash::FxHashMap;

/// The kind of a dependence edge.  The machine model maps (instruction type,
/// dependence kind) to a latency.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum DepKind {
  Data,
  Anti,
  Output,
  Other,
}

#[derive(Clone, Debug)]
pub struct IssueTypeInfo {
  pub name: String,
  pub slots_per_cycle: InstCount,
}

#[derive(Clone, Debug)]
pub struct RegTypeInfo {
  pub name: String,
  pub phys_reg_cnt: InstCount,
}

#[derive(Clone, Debug)]
pub struct InstTypeInfo {
  pub name: String,
  pub issu_type: IssueType,
  pub ltncy: InstCount,
  pub pipelined: bool,
  pub blks_cycle: bool,
}

/// The name every model must resolve when an instruction type is unknown.
pub const DEFAULT_INST_TYPE_NAME: &str = "Default";

pub struct MachineModel {
  mdl_name: String,
  issue_rate: InstCount,
  issue_types: Vec<IssueTypeInfo>,
  reg_types: Vec<RegTypeInfo>,
  inst_types: Vec<InstTypeInfo>,
  inst_type_map: FxHashMap<String, InstType>,
  dflt_inst_type: InstType,
  includes_unpipelined: bool,
}

impl MachineModel {
  /// Build and validate a model.  Register types with a zero physical count
  /// are pruned (they can never bind).  A "Default" instruction type
  /// (latency 1, pipelined) is synthesized if the caller did not provide
  /// one.
  pub fn new(
    mdl_name: &str, issue_rate: InstCount, issue_types: Vec<IssueTypeInfo>,
    reg_types: Vec<RegTypeInfo>, mut inst_types: Vec<InstTypeInfo>,
  ) -> Result<MachineModel, SchedError> {
    if issue_rate < 1 {
      return Err(SchedError::InfeasibleModel(format!(
        "issue rate {} is not positive",
        issue_rate
      )));
    }
    if issue_types.is_empty() {
      return Err(SchedError::InfeasibleModel("no issue types".to_string()));
    }
    let slot_sum: InstCount =
      issue_types.iter().map(|it| it.slots_per_cycle).sum();
    if slot_sum != issue_rate {
      return Err(SchedError::InfeasibleModel(format!(
        "issue-type slots sum to {} but the issue rate is {}",
        slot_sum, issue_rate
      )));
    }

    // Only keep register types with non-zero limits.
    let reg_types: Vec<RegTypeInfo> =
      reg_types.into_iter().filter(|rt| rt.phys_reg_cnt > 0).collect();

    if !inst_types.iter().any(|it| it.name == DEFAULT_INST_TYPE_NAME) {
      inst_types.push(InstTypeInfo {
        name: DEFAULT_INST_TYPE_NAME.to_string(),
        issu_type: 0,
        ltncy: 1,
        pipelined: true,
        blks_cycle: false,
      });
    }

    let mut inst_type_map = FxHashMap::default();
    for (i, it) in inst_types.iter().enumerate() {
      if it.issu_type as usize >= issue_types.len() {
        return Err(SchedError::InfeasibleModel(format!(
          "instruction type '{}' names issue type {} of {}",
          it.name,
          it.issu_type,
          issue_types.len()
        )));
      }
      inst_type_map.insert(it.name.clone(), i as InstType);
    }
    let dflt_inst_type = inst_type_map[DEFAULT_INST_TYPE_NAME];
    let includes_unpipelined = inst_types.iter().any(|it| !it.pipelined);

    Ok(MachineModel {
      mdl_name: mdl_name.to_string(),
      issue_rate,
      issue_types,
      reg_types,
      inst_types,
      inst_type_map,
      dflt_inst_type,
      includes_unpipelined,
    })
  }

  pub fn mdl_name(&self) -> &str {
    &self.mdl_name
  }

  pub fn issue_rate(&self) -> InstCount {
    self.issue_rate
  }

  pub fn issue_type_cnt(&self) -> usize {
    self.issue_types.len()
  }

  pub fn slots_per_cycle(&self, issu_type: IssueType) -> InstCount {
    self.issue_types[issu_type as usize].slots_per_cycle
  }

  pub fn reg_type_cnt(&self) -> usize {
    self.reg_types.len()
  }

  pub fn phys_reg_cnt(&self, reg_type: RegType) -> InstCount {
    self.reg_types[reg_type as usize].phys_reg_cnt
  }

  pub fn reg_type_name(&self, reg_type: RegType) -> &str {
    &self.reg_types[reg_type as usize].name
  }

  pub fn reg_type_by_name(&self, name: &str) -> Option<RegType> {
    self
      .reg_types
      .iter()
      .position(|rt| rt.name == name)
      .map(|i| i as RegType)
  }

  /// Look an instruction type up by name.  Unknown names resolve to `None`;
  /// callers wanting the usual fallback use `default_inst_type`.
  pub fn inst_type_by_name(&self, name: &str) -> Option<InstType> {
    self.inst_type_map.get(name).copied()
  }

  pub fn default_inst_type(&self) -> InstType {
    self.dflt_inst_type
  }

  pub fn inst_type_name(&self, inst_type: InstType) -> &str {
    &self.inst_types[inst_type as usize].name
  }

  pub fn issu_type_of(&self, inst_type: InstType) -> IssueType {
    self.inst_types[inst_type as usize].issu_type
  }

  /// The latency contributed by an edge of the given kind leaving an
  /// instruction of the given type.  Only true data dependences carry the
  /// type's full latency; other kinds resolve to unit latency.
  pub fn latency(&self, inst_type: InstType, dep_kind: DepKind) -> InstCount {
    match dep_kind {
      DepKind::Data => self.inst_types[inst_type as usize].ltncy,
      DepKind::Anti | DepKind::Output | DepKind::Other => 1,
    }
  }

  pub fn is_pipelined(&self, inst_type: InstType) -> bool {
    self.inst_types[inst_type as usize].pipelined
  }

  pub fn blocks_cycle(&self, inst_type: InstType) -> bool {
    self.inst_types[inst_type as usize].blks_cycle
  }

  pub fn includes_unpipelined(&self) -> bool {
    self.includes_unpipelined
  }
}

//=============================================================================

#[cfg(test)]
mod test {
  use super::*;

  fn simple_model() -> MachineModel {
    MachineModel::new(
      "test",
      2,
      vec![
        IssueTypeInfo { name: "alu".to_string(), slots_per_cycle: 1 },
        IssueTypeInfo { name: "mem".to_string(), slots_per_cycle: 1 },
      ],
      vec![
        RegTypeInfo { name: "GPR".to_string(), phys_reg_cnt: 4 },
        RegTypeInfo { name: "CCR".to_string(), phys_reg_cnt: 0 },
      ],
      vec![InstTypeInfo {
        name: "mul".to_string(),
        issu_type: 0,
        ltncy: 3,
        pipelined: false,
        blks_cycle: false,
      }],
    )
    .unwrap()
  }

  #[test]
  fn test_default_fallback() {
    let mm = simple_model();
    assert!(mm.inst_type_by_name("frobnicate").is_none());
    let dflt = mm.default_inst_type();
    assert_eq!(mm.inst_type_name(dflt), DEFAULT_INST_TYPE_NAME);
    assert_eq!(mm.latency(dflt, DepKind::Data), 1);
    assert!(mm.is_pipelined(dflt));
  }

  #[test]
  fn test_zero_limit_reg_types_pruned() {
    let mm = simple_model();
    assert_eq!(mm.reg_type_cnt(), 1);
    assert_eq!(mm.reg_type_name(0), "GPR");
    assert!(mm.reg_type_by_name("CCR").is_none());
  }

  #[test]
  fn test_latency_by_dep_kind() {
    let mm = simple_model();
    let mul = mm.inst_type_by_name("mul").unwrap();
    assert_eq!(mm.latency(mul, DepKind::Data), 3);
    assert_eq!(mm.latency(mul, DepKind::Anti), 1);
    assert_eq!(mm.latency(mul, DepKind::Other), 1);
    assert!(!mm.is_pipelined(mul));
    assert!(mm.includes_unpipelined());
  }

  #[test]
  fn test_inconsistent_slot_totals_rejected() {
    let res = MachineModel::new(
      "bad",
      3,
      vec![IssueTypeInfo { name: "alu".to_string(), slots_per_cycle: 2 }],
      vec![],
      vec![],
    );
    assert!(res.is_err());
    let res = MachineModel::new("bad", 0, vec![], vec![], vec![]);
    assert!(res.is_err());
  }
}
