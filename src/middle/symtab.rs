//! The symbol table tree.
//!
//! Each procedure owns exactly one [`Scope`]; nested procedures get a child
//! scope whose `parent` points at the enclosing one. Symbols live in one
//! flat arena and are referenced everywhere else by [`SymId`], never by
//! pointer or clone, matching the arena-and-handle shape used for every
//! other graph in this crate.

use crate::common::{Id, Set};
use crate::middle::ir::{self, Instr, ProcId, SymId, TypeDesc};

/// A declared name: a variable, constant, or procedure.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Id,
    pub ty: TypeDesc,
    /// `Some` for `const` declarations; such symbols never get a register
    /// or a stack slot.
    pub value: Option<i64>,
    /// The procedure that owns this symbol. `None` only for the synthetic
    /// global procedure symbol itself.
    pub level: Option<ProcId>,
    /// Compiler-introduced temporary, never spans a block boundary live and
    /// never takes a stack slot at its frame.
    pub temp: bool,
    /// Register assigned to this symbol, one entry per procedure it is
    /// live in (the same symbol can be colored differently
    /// depending on which procedure's interference graph it appears in).
    pub registers: crate::common::Map<ProcId, ir::Register>,
}

impl Symbol {
    pub fn is_function(&self) -> bool {
        self.ty.kind == ir::TypeKind::Function
    }

    pub fn is_const(&self) -> bool {
        self.value.is_some()
    }
}

/// Handle into [`SymbolTable::scopes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Clone, Debug)]
pub struct Scope {
    pub proc: ProcId,
    pub parent: Option<ScopeId>,
    /// Symbols declared directly in this scope, in declaration order.
    pub symbols: Vec<SymId>,
    temp_counter: u32,
}

/// The symbol-table tree plus its flat symbol arena.
pub struct SymbolTable {
    pub symbols: Vec<Symbol>,
    pub scopes: Vec<Scope>,
    pub root: ScopeId,
    pub global_proc: ProcId,
}

impl SymbolTable {
    /// Builds a table containing only the synthetic `global` procedure
    /// symbol and its (empty) root scope.
    pub fn new() -> SymbolTable {
        let global = Symbol {
            name: Id::from("global".to_string()),
            ty: ir::FUNCTION,
            value: None,
            level: None,
            temp: false,
            registers: crate::common::Map::new(),
        };
        let global_proc = SymId(0);
        let root_scope = Scope { proc: global_proc, parent: None, symbols: Vec::new(), temp_counter: 0 };
        SymbolTable {
            symbols: vec![global],
            scopes: vec![root_scope],
            root: ScopeId(0),
            global_proc,
        }
    }

    pub fn symbol(&self, id: SymId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Declares a new non-procedure symbol in `scope`, returning its id.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: Id,
        ty: TypeDesc,
        value: Option<i64>,
    ) -> SymId {
        let proc = self.scope(scope).proc;
        let id = SymId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name,
            ty,
            value,
            level: Some(proc),
            temp: false,
            registers: crate::common::Map::new(),
        });
        self.scopes[scope.0 as usize].symbols.push(id);
        id
    }

    /// Declares a nested procedure: allocates its function symbol in
    /// `parent_scope` and opens a fresh child scope for its body.
    pub fn declare_procedure(&mut self, parent_scope: ScopeId, name: Id) -> (SymId, ScopeId) {
        let enclosing = self.scope(parent_scope).proc;
        let proc_id = SymId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name,
            ty: ir::FUNCTION,
            value: None,
            level: Some(enclosing),
            temp: false,
            registers: crate::common::Map::new(),
        });
        self.scopes[parent_scope.0 as usize].symbols.push(proc_id);
        let scope_id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope { proc: proc_id, parent: Some(parent_scope), symbols: Vec::new(), temp_counter: 0 });
        (proc_id, scope_id)
    }

    /// Creates a scope for the synthetic `main` body (the top-level
    /// statement list lives in the global procedure's own scope, so this
    /// is only used once, for `root`).
    pub fn root_scope(&self) -> ScopeId {
        self.root
    }

    /// Looks up `name`, searching outward through enclosing scopes.
    pub fn find(&self, mut scope: ScopeId, name: &str) -> Option<SymId> {
        loop {
            let s = self.scope(scope);
            if let Some(&id) = s.symbols.iter().rev().find(|&&id| self.symbol(id).name.as_str() == name) {
                return Some(id);
            }
            match s.parent {
                Some(p) => scope = p,
                None => return None,
            }
        }
    }

    /// Allocates a fresh `int`-typed temporary in `scope`.
    pub fn fresh_temp(&mut self, scope: ScopeId) -> SymId {
        let proc = self.scope(scope).proc;
        let n = {
            let s = &mut self.scopes[scope.0 as usize];
            s.temp_counter += 1;
            s.temp_counter
        };
        let name = Id::from(format!("t${n}${}", self.symbol(proc).name));
        let id = SymId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name,
            ty: ir::INT,
            value: None,
            level: Some(proc),
            temp: true,
            registers: crate::common::Map::new(),
        });
        self.scopes[scope.0 as usize].symbols.push(id);
        id
    }

    /// All non-temporary, non-constant locals declared directly in
    /// `proc`'s own scope, in declaration order.
    pub fn locals_of(&self, scope: ScopeId) -> Vec<SymId> {
        self.scope(scope)
            .symbols
            .iter()
            .copied()
            .filter(|&id| {
                let sym = self.symbol(id);
                !sym.temp && !sym.is_const() && !sym.is_function()
            })
            .collect()
    }

    /// The set of procedures whose frame is referenced by a `Var` inside
    /// `instrs` but which is neither `proc` itself nor a constant or
    /// function symbol (its "external variables", used as the
    /// seed for call-graph `uses(f)`).
    pub fn external_procs(&self, proc: ProcId, instrs: &[Instr]) -> Set<ProcId> {
        let mut out = Set::new();
        for instr in instrs {
            for v in instr.uses() {
                let sym = self.symbol(v);
                if sym.is_function() || sym.is_const() {
                    continue;
                }
                if let Some(level) = sym.level {
                    if level != proc {
                        out.insert(level);
                    }
                }
            }
        }
        out
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
