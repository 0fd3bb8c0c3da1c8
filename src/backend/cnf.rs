//! CNF backend: elementary operations lower to fresh variables and clauses
//! in a [`ClauseStore`].

use std::collections::HashMap;

use crate::backend::{AddOutput, Backend};
use crate::error::Result;
use crate::literal::{Literal, VarGen};
use crate::store::ClauseStore;
use crate::tables::{add_template, AddOutputBit};

#[derive(Debug)]
pub struct CnfBackend {
    pub store: ClauseStore,
    pub vargen: VarGen,
    xor_max_args: usize,
    add_max_args: usize,
}

impl CnfBackend {
    pub fn new(add_max_args: usize, xor_max_args: usize) -> CnfBackend {
        CnfBackend {
            store: ClauseStore::new(),
            vargen: VarGen::new(),
            xor_max_args: xor_max_args.clamp(2, 32),
            add_max_args: add_max_args.clamp(2, 6),
        }
    }

    fn emit_xor_clauses(&mut self, args: &[Literal], r: Literal) -> Result<()> {
        let n = args.len();
        for mask in 0u32..(1u32 << n) {
            let mut literals = Vec::with_capacity(n + 1);
            let mut parity = false;
            for (i, &a) in args.iter().enumerate() {
                let bit = (mask >> i) & 1 == 1;
                parity ^= bit;
                literals.push(if bit { a.negate() } else { a });
            }
            literals.push(if parity { r } else { r.negate() });
            self.store.add_clause(&literals)?;
        }
        Ok(())
    }

    fn emit_template(
        &mut self,
        arity: usize,
        constant_bit: bool,
        output: AddOutputBit,
        args: &[Literal],
        out: Literal,
    ) -> Result<()> {
        for (row, sign) in add_template(arity, constant_bit, output) {
            let mut literals = Vec::with_capacity(arity + 1);
            for (i, slot) in row.iter().enumerate() {
                if let Some(assumed) = slot {
                    literals.push(if *assumed { args[i].negate() } else { args[i] });
                }
            }
            literals.push(if *sign { out } else { out.negate() });
            self.store.add_clause(&literals)?;
        }
        Ok(())
    }
}

impl Backend for CnfBackend {
    fn fresh(&mut self) -> Result<Literal> {
        self.vargen.fresh()
    }

    fn not(&mut self, x: Literal) -> Literal {
        x.negate()
    }

    fn and(&mut self, x: Literal, y: Literal) -> Result<Literal> {
        if x.is_constant() {
            return Ok(if x.value() { y } else { Literal::FALSE });
        }
        if y.is_constant() {
            return Ok(if y.value() { x } else { Literal::FALSE });
        }
        if x == y {
            return Ok(x);
        }
        if x == y.negate() {
            return Ok(Literal::FALSE);
        }
        let r = self.vargen.fresh()?;
        self.store.add_clause(&[x.negate(), y.negate(), r])?;
        self.store.add_clause(&[x, r.negate()])?;
        self.store.add_clause(&[y, r.negate()])?;
        Ok(r)
    }

    fn or(&mut self, x: Literal, y: Literal) -> Result<Literal> {
        if x.is_constant() {
            return Ok(if x.value() { Literal::TRUE } else { y });
        }
        if y.is_constant() {
            return Ok(if y.value() { Literal::TRUE } else { x });
        }
        if x == y {
            return Ok(x);
        }
        if x == y.negate() {
            return Ok(Literal::TRUE);
        }
        let r = self.vargen.fresh()?;
        self.store.add_clause(&[x, y, r.negate()])?;
        self.store.add_clause(&[x.negate(), r])?;
        self.store.add_clause(&[y.negate(), r])?;
        Ok(r)
    }

    fn xor(&mut self, args: &[Literal]) -> Result<Literal> {
        let mut constant = false;
        let mut counts: HashMap<u32, (u32, u32)> = HashMap::new();
        for &a in args {
            if a.is_constant() {
                constant ^= a.value();
                continue;
            }
            let e = counts.entry(a.variable()).or_insert((0, 0));
            if a.is_direct() {
                e.0 += 1;
            } else {
                e.1 += 1;
            }
        }
        let mut vars: Vec<u32> = counts.keys().copied().collect();
        vars.sort_unstable();
        let mut reduced: Vec<Literal> = Vec::new();
        for v in vars {
            let (direct, negated) = counts[&v];
            if (direct + negated) % 2 == 1 {
                reduced.push(Literal::var(v));
            }
            if negated % 2 == 1 {
                constant ^= true;
            }
        }

        if reduced.is_empty() {
            return Ok(Literal::constant(constant));
        }

        let max = self.xor_max_args;
        let mut terms = reduced;
        while terms.len() > 1 {
            let take = terms.len().min(max);
            let batch: Vec<Literal> = terms.drain(0..take).collect();
            let r = self.vargen.fresh()?;
            self.emit_xor_clauses(&batch, r)?;
            terms.insert(0, r);
        }
        let mut result = terms.remove(0);
        if constant {
            result = result.negate();
        }
        Ok(result)
    }

    fn ch(&mut self, x: Literal, y: Literal, z: Literal) -> Result<Literal> {
        if x.is_constant() {
            return Ok(if x.value() { y } else { z });
        }
        if y == z {
            return Ok(y);
        }
        if y.is_constant() && z.is_constant() {
            return Ok(if y.value() { x } else { x.negate() });
        }
        if x == y {
            return self.or(x, z);
        }
        if x == y.negate() {
            return self.and(x.negate(), z);
        }
        if x == z {
            return self.and(x, y);
        }
        if x == z.negate() {
            return self.or(x.negate(), y);
        }
        let r = self.vargen.fresh()?;
        self.store.add_clause(&[x.negate(), y.negate(), r])?;
        self.store.add_clause(&[x.negate(), y, r.negate()])?;
        self.store.add_clause(&[x, z.negate(), r])?;
        self.store.add_clause(&[x, z, r.negate()])?;
        self.store.add_clause(&[y.negate(), z.negate(), r])?;
        self.store.add_clause(&[y, z, r.negate()])?;
        Ok(r)
    }

    fn maj(&mut self, x: Literal, y: Literal, z: Literal) -> Result<Literal> {
        if x == y || x == z {
            return Ok(x);
        }
        if y == z {
            return Ok(y);
        }
        if x == y.negate() {
            return Ok(z);
        }
        if x == z.negate() {
            return Ok(y);
        }
        if y == z.negate() {
            return Ok(x);
        }
        if x.is_constant() {
            return if x.value() { self.or(y, z) } else { self.and(y, z) };
        }
        if y.is_constant() {
            return if y.value() { self.or(x, z) } else { self.and(x, z) };
        }
        if z.is_constant() {
            return if z.value() { self.or(x, y) } else { self.and(x, y) };
        }
        let r = self.vargen.fresh()?;
        self.store.add_clause(&[x.negate(), y.negate(), r])?;
        self.store.add_clause(&[x.negate(), z.negate(), r])?;
        self.store.add_clause(&[y.negate(), z.negate(), r])?;
        self.store.add_clause(&[x, y, r.negate()])?;
        self.store.add_clause(&[x, z, r.negate()])?;
        self.store.add_clause(&[y, z, r.negate()])?;
        Ok(r)
    }

    fn add(&mut self, args: &[Literal], constant_bit: bool, want_c2: bool) -> Result<AddOutput> {
        let arity = args.len();
        debug_assert!((2..=6).contains(&arity));
        if args.iter().all(|a| a.is_constant()) {
            let total = constant_bit as u32 + args.iter().filter(|a| a.value()).count() as u32;
            return Ok(AddOutput {
                sum: Literal::constant(total & 1 == 1),
                c1: Literal::constant((total >> 1) & 1 == 1),
                c2: if want_c2 { Some(Literal::constant((total >> 2) & 1 == 1)) } else { None },
            });
        }
        let sum = self.vargen.fresh()?;
        self.emit_template(arity, constant_bit, AddOutputBit::Sum, args, sum)?;
        let c1 = self.vargen.fresh()?;
        self.emit_template(arity, constant_bit, AddOutputBit::C1, args, c1)?;
        let c2 = if want_c2 {
            let v = self.vargen.fresh()?;
            self.emit_template(arity, constant_bit, AddOutputBit::C2, args, v)?;
            Some(v)
        } else {
            None
        };
        Ok(AddOutput { sum, c1, c2 })
    }

    fn xor_max_args(&self) -> usize {
        self.xor_max_args
    }

    fn add_max_args(&self) -> usize {
        self.add_max_args
    }
}
