use super::runtime::{grow_stack, CallFrame, Lambda};
use super::val::MAX_ELEMENTS;
use super::{Function, Operation, Runtime, Val};
use crate::error;
use crate::lang::ast::Expression;
use crate::lang::{parse, Error};
use chrono::Local;
use indexmap::IndexMap;
use rand::Rng;

type Result<T> = std::result::Result<T, Error>;

/// Exact key first, then a case-insensitive match.
pub(super) fn dict_get<'a>(dict: &'a IndexMap<String, Val>, key: &str) -> Option<&'a Val> {
    dict.get(key).or_else(|| {
        dict.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// Inserts, replacing a key that differs only in case.
pub(super) fn dict_put(dict: &mut IndexMap<String, Val>, key: &str, value: Val) {
    let existing = dict
        .keys()
        .find(|k| k.as_str() != key && k.eq_ignore_ascii_case(key))
        .cloned();
    match existing {
        Some(existing) if !dict.contains_key(key) => {
            dict.insert(existing, value);
        }
        _ => {
            dict.insert(key.to_string(), value);
        }
    }
}

/// Negative indexes count back from the end.
fn position(len: usize, index: i64) -> Option<usize> {
    let i = if index < 0 { len as i64 + index } else { index };
    if i >= 0 && (i as usize) < len {
        Some(i as usize)
    } else {
        None
    }
}

impl Runtime {
    pub(super) fn eval(&mut self, text: &str) -> Result<Val> {
        let expr = parse(text.trim())?;
        self.evaluate(&expr)
    }

    pub(super) fn eval_number(&mut self, text: &str) -> Result<f64> {
        self.eval(text)?.to_f64()
    }

    pub(super) fn eval_int(&mut self, text: &str) -> Result<i64> {
        self.eval(text)?.to_i64()
    }

    pub(super) fn eval_bool(&mut self, text: &str) -> Result<bool> {
        Ok(self.eval(text)?.is_truthy())
    }

    pub(super) fn evaluate(&mut self, expr: &Expression) -> Result<Val> {
        use Expression::*;
        match expr {
            Integer(n) => Ok(Val::Integer(*n)),
            Float(n) => Ok(Val::Float(*n)),
            String(s) => Ok(Val::String(s.clone())),
            Var(name) => Ok(self.fetch_var(name)),
            SysVar(name) => Ok(self.system_var(name)),
            Call(name, args) => self.call(name, args),
            Subscript(name, index) => {
                let index = self.evaluate(index)?;
                self.element(name, &index)
            }
            Field(name, key) => self.field(name, key),
            List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item)?);
                }
                Ok(Val::List(values))
            }
            Negate(expr) => {
                let val = self.evaluate(expr)?;
                Operation::negate(val)
            }
            Not(expr) => {
                let val = self.evaluate(expr)?;
                Ok(Operation::not(val))
            }
            Binary(op, lhs, rhs) => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                Operation::binary(*op, lhs, rhs)
            }
        }
    }

    /// Variables shadow pseudo-variables and constants of the same name.
    pub(super) fn fetch_var(&mut self, name: &str) -> Val {
        if let Some(val) = self.vars.fetch(name) {
            return val;
        }
        match name {
            "TIMER" => {
                let secs = self.started.elapsed().as_secs_f64();
                Val::Float((secs * 1000.0).round() / 1000.0)
            }
            "DATE$" => Val::String(Local::now().format("%Y-%m-%d").to_string()),
            "TIME$" => Val::String(Local::now().format("%H:%M:%S").to_string()),
            "RESULT" => self.result.clone(),
            "ERROR$" => Val::String(self.last_error.clone()),
            "RND" => Val::Float(self.rng.gen::<f64>()),
            "PI" => Val::Float(std::f64::consts::PI),
            "E" => Val::Float(std::f64::consts::E),
            "TAU" => Val::Float(std::f64::consts::TAU),
            "INF" => Val::Float(f64::INFINITY),
            _ => self.vars.fetch_or_default(name),
        }
    }

    /// PILOT registers, read as `%name%`.
    pub(super) fn system_var(&self, name: &str) -> Val {
        match name.to_ascii_lowercase().as_str() {
            "answer" => self.answer.clone(),
            "matched" => Val::String(self.matched.clone()),
            "status" => Val::Integer(self.status),
            "left" => Val::String(self.left.clone()),
            "right" => Val::String(self.right.clone()),
            _ => Val::String(String::new()),
        }
    }

    fn call(&mut self, name: &str, args: &[Expression]) -> Result<Val> {
        if self.program.routines().contains_key(name) {
            let args = self.evaluate_all(args)?;
            return self.call_routine(name, args);
        }
        if let Some(lambda) = self.lambdas.get(name).cloned() {
            let args = self.evaluate_all(args)?;
            return self.call_lambda(name, &lambda, args);
        }
        if name == "TYPEOF" && args.len() == 1 {
            let val = self.evaluate(&args[0])?;
            return Ok(Val::String(val.type_name().to_string()));
        }
        if Function::is_builtin(name) && !self.vars.contains(name) {
            let args = self.evaluate_all(args)?;
            return Function::call(name, args, &mut self.rng);
        }
        if args.len() == 1 {
            let index = self.evaluate(&args[0])?;
            return self.element(name, &index);
        }
        if args.len() > 1 {
            return Err(error!(SubscriptOutOfRange; format!("{} TAKES ONE SUBSCRIPT", name)));
        }
        Err(error!(UndefinedUserFunction; name))
    }

    fn evaluate_all(&mut self, args: &[Expression]) -> Result<Vec<Val>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg)?);
        }
        Ok(values)
    }

    /// Applies a user function or lambda by name, as MAP and friends do.
    pub(super) fn apply(&mut self, name: &str, args: Vec<Val>) -> Result<Val> {
        if let Some(lambda) = self.lambdas.get(name).cloned() {
            return self.call_lambda(name, &lambda, args);
        }
        if self.program.routines().contains_key(name) {
            return self.call_routine(name, args);
        }
        if Function::is_builtin(name) {
            return Function::call(name, args, &mut self.rng);
        }
        Err(error!(UndefinedUserFunction; name))
    }

    fn call_lambda(&mut self, name: &str, lambda: &Lambda, args: Vec<Val>) -> Result<Val> {
        if args.len() != lambda.params.len() {
            return Err(error!(IllegalFunctionCall;
                format!("{} EXPECTS {} ARGUMENTS", name, lambda.params.len())));
        }
        let saved = self.bind(&lambda.params, args);
        let frame = CallFrame {
            return_pc: self.pc,
            saved: vec![],
            bases: self.bases(),
        };
        let outcome = match self.calls.push(frame) {
            Ok(()) => grow_stack(|| self.evaluate(&lambda.body)),
            Err(error) => Err(error),
        };
        self.calls.pop();
        self.restore(saved);
        outcome
    }

    /// `NAME(i)` or `NAME[i]`: list, dict, string or array element.
    pub(super) fn element(&mut self, name: &str, index: &Val) -> Result<Val> {
        if let Some(list) = self.vars.list(name) {
            let i = index.to_i64()?;
            return match position(list.len(), i) {
                Some(i) => Ok(list[i].clone()),
                None => Err(error!(SubscriptOutOfRange; format!("{}[{}]", name, i))),
            };
        }
        if let Some(dict) = self.vars.dict(name) {
            return Ok(dict_get(dict, &index.to_string())
                .cloned()
                .unwrap_or_default());
        }
        if let Some(Val::String(s)) = self.vars.fetch(name) {
            if !self.vars.has_array(name) {
                let i = index.to_i64()?;
                let chars: Vec<char> = s.chars().collect();
                return match position(chars.len(), i) {
                    Some(i) => Ok(Val::String(chars[i].to_string())),
                    None => Err(error!(SubscriptOutOfRange; format!("{}[{}]", name, i))),
                };
            }
        }
        self.vars.fetch_array(name, index.to_i64()?)
    }

    fn field(&mut self, name: &str, key: &str) -> Result<Val> {
        match self.vars.dict(name) {
            Some(dict) => Ok(dict_get(dict, key).cloned().unwrap_or_default()),
            None if self.vars.contains(name) => {
                Err(error!(TypeMismatch; format!("{} IS NOT A DICT", name)))
            }
            None => Ok(Val::Null),
        }
    }

    /// Stores into a variable, array element, list slot or dict field
    /// written as source text.
    pub(super) fn assign(&mut self, target: &str, value: Val) -> Result<()> {
        let expr = parse(target.trim())?;
        self.assign_to(&expr, value)
    }

    pub(super) fn assign_to(&mut self, target: &Expression, value: Val) -> Result<()> {
        match target {
            Expression::Var(name) => self.vars.store(name, value),
            Expression::Call(name, args) if args.len() == 1 => {
                let index = self.evaluate(&args[0])?;
                self.store_element(name, &index, value)
            }
            Expression::Subscript(name, index) => {
                let index = self.evaluate(index)?;
                self.store_element(name, &index, value)
            }
            Expression::Field(name, key) => self.store_field(name, key, value),
            _ => Err(error!(SyntaxError; format!("CANNOT ASSIGN TO {}", target))),
        }
    }

    fn store_element(&mut self, name: &str, index: &Val, value: Val) -> Result<()> {
        if self.vars.is_const(name) {
            return Err(error!(ConstantReassigned; format!("CANNOT REASSIGN CONSTANT {}", name)));
        }
        if let Some(list) = self.vars.list_mut(name) {
            let i = index.to_i64()?;
            let slot = if i < 0 {
                position(list.len(), i)
            } else {
                Some(i as usize)
            };
            let slot = match slot {
                Some(slot) => slot,
                None => return Err(error!(SubscriptOutOfRange; format!("{}[{}]", name, i))),
            };
            if slot >= list.len() {
                if slot >= MAX_ELEMENTS {
                    return Err(error!(SubscriptOutOfRange; format!("{}[{}]", name, i)));
                }
                list.resize(slot + 1, Val::Integer(0));
            }
            list[slot] = value;
            self.sync_length(name);
            return Ok(());
        }
        if let Some(dict) = self.vars.dict_mut(name) {
            dict_put(dict, &index.to_string(), value);
            return Ok(());
        }
        self.vars.store_array(name, index.to_i64()?, value)
    }

    pub(super) fn store_field(&mut self, name: &str, key: &str, value: Val) -> Result<()> {
        if self.vars.is_const(name) {
            return Err(error!(ConstantReassigned; format!("CANNOT REASSIGN CONSTANT {}", name)));
        }
        if self.vars.dict(name).is_none() {
            self.vars.set_dict(name, IndexMap::new());
        }
        if let Some(dict) = self.vars.dict_mut(name) {
            dict_put(dict, key, value);
        }
        Ok(())
    }

    /// Keeps `NAME_LENGTH` in step with list `NAME`.
    pub(super) fn sync_length(&mut self, name: &str) {
        if let Some(len) = self.vars.list(name).map(|l| l.len()) {
            self.vars
                .store_unchecked(&format!("{}_LENGTH", name), Val::Integer(len as i64));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::BufferOutput;

    fn runtime() -> Runtime {
        Runtime::default().with_output(BufferOutput::new())
    }

    #[test]
    fn test_arithmetic_and_strings() {
        let mut r = runtime();
        assert_eq!(r.eval("2 + 3 * 4").unwrap(), Val::Integer(14));
        assert_eq!(r.eval("7 / 2").unwrap(), Val::Float(3.5));
        assert_eq!(r.eval("\"a\" + 1").unwrap(), Val::from("a1"));
        assert_eq!(r.eval("LEN(\"hello\")").unwrap(), Val::Integer(5));
        assert!(r.eval("1 / 0").is_err());
    }

    #[test]
    fn test_pseudo_variables_yield_to_user_variables() {
        let mut r = runtime();
        assert_eq!(r.eval("PI").unwrap(), Val::Float(std::f64::consts::PI));
        r.assign("PI", Val::Integer(3)).unwrap();
        assert_eq!(r.eval("PI").unwrap(), Val::Integer(3));
        assert_eq!(r.eval("UNSET$").unwrap(), Val::from(""));
    }

    #[test]
    fn test_list_and_dict_access() {
        let mut r = runtime();
        r.assign("L", Val::List(vec![Val::Integer(10), Val::Integer(20)]))
            .unwrap();
        assert_eq!(r.eval("L[1]").unwrap(), Val::Integer(20));
        assert_eq!(r.eval("L(-1)").unwrap(), Val::Integer(20));
        r.assign("L[3]", Val::Integer(5)).unwrap();
        assert_eq!(r.eval("L_LENGTH").unwrap(), Val::Integer(4));
        r.assign("D.Name", Val::from("Ada")).unwrap();
        assert_eq!(r.eval("D.name").unwrap(), Val::from("Ada"));
        assert_eq!(r.eval("D[\"NAME\"]").unwrap(), Val::from("Ada"));
    }

    #[test]
    fn test_arrays() {
        let mut r = runtime();
        r.assign("A(3)", Val::Integer(7)).unwrap();
        assert_eq!(r.eval("A(3) * 2").unwrap(), Val::Integer(14));
        assert_eq!(
            r.eval("A(11)").unwrap_err().to_string(),
            "SUBSCRIPT OUT OF RANGE; A(11)"
        );
    }
}
