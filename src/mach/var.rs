use super::Val;
use crate::error;
use crate::lang::Error;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

type Result<T> = std::result::Result<T, Error>;

/// ## Variable memory
///
/// A name lives in exactly one of three homes: scalars, lists or dicts.
/// Storing into one home evicts the name from the others. Arrays made by
/// DIM are a separate namespace, as in classic BASIC.

#[derive(Debug, Default)]
pub struct Var {
    vars: HashMap<String, Val>,
    constants: HashSet<String>,
    arrays: HashMap<String, Vec<Val>>,
    lists: HashMap<String, Vec<Val>>,
    dicts: HashMap<String, IndexMap<String, Val>>,
}

impl Var {
    pub fn new() -> Var {
        Var::default()
    }

    pub fn clear(&mut self) {
        self.vars.clear();
        self.constants.clear();
        self.arrays.clear();
        self.lists.clear();
        self.dicts.clear();
    }

    /// Current value from whichever home holds the name.
    pub fn fetch(&self, var_name: &str) -> Option<Val> {
        if let Some(val) = self.vars.get(var_name) {
            return Some(val.clone());
        }
        if let Some(list) = self.lists.get(var_name) {
            return Some(Val::List(list.clone()));
        }
        self.dicts.get(var_name).map(|d| Val::Dict(d.clone()))
    }

    pub fn contains(&self, var_name: &str) -> bool {
        self.vars.contains_key(var_name)
            || self.lists.contains_key(var_name)
            || self.dicts.contains_key(var_name)
    }

    /// Unset names read as 0, or "" for `$` names.
    pub fn fetch_or_default(&self, var_name: &str) -> Val {
        match self.fetch(var_name) {
            Some(val) => val,
            None if var_name.ends_with('$') => Val::String(String::new()),
            None => Val::Integer(0),
        }
    }

    pub fn store(&mut self, var_name: &str, value: Val) -> Result<()> {
        if self.constants.contains(var_name) {
            return Err(error!(ConstantReassigned; format!("CANNOT REASSIGN CONSTANT {}", var_name)));
        }
        self.store_unchecked(var_name, value);
        Ok(())
    }

    /// Used by internal bookkeeping and parameter restore; ignores CONST.
    pub fn store_unchecked(&mut self, var_name: &str, value: Val) {
        match value {
            Val::List(list) => self.set_list(var_name, list),
            Val::Dict(dict) => self.set_dict(var_name, dict),
            value => {
                self.lists.remove(var_name);
                self.dicts.remove(var_name);
                self.vars.insert(var_name.to_string(), value);
            }
        }
    }

    pub fn store_const(&mut self, var_name: &str, value: Val) -> Result<()> {
        self.store(var_name, value)?;
        self.constants.insert(var_name.to_string());
        Ok(())
    }

    pub fn is_const(&self, var_name: &str) -> bool {
        self.constants.contains(var_name)
    }

    /// Removes the name from every home and returns what it held.
    pub fn unset(&mut self, var_name: &str) -> Option<Val> {
        let val = self.fetch(var_name);
        self.vars.remove(var_name);
        self.lists.remove(var_name);
        self.dicts.remove(var_name);
        val
    }

    pub fn dimension_array(&mut self, var_name: &str, size: usize) {
        let fill = if var_name.ends_with('$') {
            Val::String(String::new())
        } else {
            Val::Integer(0)
        };
        self.arrays
            .insert(var_name.to_string(), vec![fill; size.saturating_add(1)]);
    }

    pub fn has_array(&self, var_name: &str) -> bool {
        self.arrays.contains_key(var_name)
    }

    pub fn fetch_array(&mut self, var_name: &str, index: i64) -> Result<Val> {
        let array = self.array(var_name);
        match usize::try_from(index).ok().and_then(|i| array.get(i)) {
            Some(val) => Ok(val.clone()),
            None => Err(error!(SubscriptOutOfRange; format!("{}({})", var_name, index))),
        }
    }

    pub fn store_array(&mut self, var_name: &str, index: i64, value: Val) -> Result<()> {
        let array = self.array(var_name);
        match usize::try_from(index).ok().and_then(|i| array.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(error!(SubscriptOutOfRange; format!("{}({})", var_name, index))),
        }
    }

    /// Undimensioned arrays spring into existence with 11 elements.
    fn array(&mut self, var_name: &str) -> &mut Vec<Val> {
        if !self.arrays.contains_key(var_name) {
            self.dimension_array(var_name, 10);
        }
        self.arrays.entry(var_name.to_string()).or_default()
    }

    pub fn list(&self, var_name: &str) -> Option<&Vec<Val>> {
        self.lists.get(var_name)
    }

    pub fn list_mut(&mut self, var_name: &str) -> Option<&mut Vec<Val>> {
        self.lists.get_mut(var_name)
    }

    pub fn set_list(&mut self, var_name: &str, list: Vec<Val>) {
        self.vars.remove(var_name);
        self.dicts.remove(var_name);
        self.lists.insert(var_name.to_string(), list);
    }

    pub fn dict(&self, var_name: &str) -> Option<&IndexMap<String, Val>> {
        self.dicts.get(var_name)
    }

    pub fn dict_mut(&mut self, var_name: &str) -> Option<&mut IndexMap<String, Val>> {
        self.dicts.get_mut(var_name)
    }

    pub fn set_dict(&mut self, var_name: &str, dict: IndexMap<String, Val>) {
        self.vars.remove(var_name);
        self.lists.remove(var_name);
        self.dicts.insert(var_name.to_string(), dict);
    }

    /// Every scalar, list and dict, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, Val)> {
        let mut all: Vec<(String, Val)> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .chain(self.lists.iter().map(|(k, v)| (k.clone(), Val::List(v.clone()))))
            .chain(self.dicts.iter().map(|(k, v)| (k.clone(), Val::Dict(v.clone()))))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_has_one_home() {
        let mut var = Var::new();
        var.store("A", Val::Integer(5)).unwrap();
        var.set_list("A", vec![Val::Integer(1)]);
        assert_eq!(var.fetch("A"), Some(Val::List(vec![Val::Integer(1)])));
        var.store("A", Val::Integer(2)).unwrap();
        assert!(var.list("A").is_none());
    }

    #[test]
    fn test_constants_are_protected() {
        let mut var = Var::new();
        var.store_const("MAX", Val::Integer(10)).unwrap();
        let e = var.store("MAX", Val::Integer(1)).unwrap_err();
        assert_eq!(e.to_string(), "CONSTANT REASSIGNED; CANNOT REASSIGN CONSTANT MAX");
        assert_eq!(var.fetch("MAX"), Some(Val::Integer(10)));
    }

    #[test]
    fn test_arrays_auto_dimension() {
        let mut var = Var::new();
        assert_eq!(var.fetch_array("B", 10).unwrap(), Val::Integer(0));
        assert!(var.fetch_array("B", 11).is_err());
        var.dimension_array("C$", 2);
        var.store_array("C$", 2, Val::from("x")).unwrap();
        assert_eq!(var.fetch_array("C$", 2).unwrap(), Val::from("x"));
        assert!(var.store_array("C$", -1, Val::Null).is_err());
    }

    #[test]
    fn test_defaults_by_suffix() {
        let var = Var::new();
        assert_eq!(var.fetch_or_default("N"), Val::Integer(0));
        assert_eq!(var.fetch_or_default("N$"), Val::from(""));
    }
}
