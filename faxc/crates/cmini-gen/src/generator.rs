//! The tree-walking code generator (§4.4).
//!
//! A stack-discipline emitter: every [`Expr`], once generated, leaves
//! exactly one 8-byte value on the machine stack; every [`Stmt`] leaves one
//! value too (either its last expression's value or the `0xdb` sentinel).
//! `Block` pops one slot per child statement and then contributes its own
//! sentinel, so the invariant holds uniformly at every statement/expression
//! boundary without special-casing "this branch produced no value".

use crate::emit::{instr, label};
use crate::error::{CodegenError, Result};
use cmini_par::{type_of, Expr, ExprKind, Stmt, Storage, Type};
use cmini_sem::{load_width, pointer_scale, store_width};
use cmini_util::{Span, Width};

/// System V argument registers, indexed `[Width::Byte, Width::Dword,
/// Width::Qword]` by position, per §4.4 ("Argument registers in order:
/// rdi/edi/dil, rsi/esi/sil, ...").
pub(crate) const ARG_REGS: [[&str; 3]; 6] = [
    ["dil", "edi", "rdi"],
    ["sil", "esi", "rsi"],
    ["dl", "edx", "rdx"],
    ["cl", "ecx", "rcx"],
    ["r8b", "r8d", "r8"],
    ["r9b", "r9d", "r9"],
];

pub(crate) fn width_index(width: Width) -> usize {
    match width {
        Width::Byte => 0,
        Width::Dword => 1,
        Width::Qword => 2,
    }
}

pub(crate) fn string_label(id: u32) -> String {
    format!(".LC{id}")
}

/// Owns the output buffer and the monotonically increasing label counter
/// (`label_seq`), which is shared across the whole program rather than
/// reset per function: assembly labels are file-scoped, so two functions'
/// `.Lbegin0` would otherwise collide.
pub(crate) struct Generator {
    pub(crate) out: String,
    label_seq: u32,
}

impl Generator {
    pub(crate) fn new() -> Self {
        Self {
            out: String::new(),
            label_seq: 0,
        }
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    fn next_label(&mut self) -> u32 {
        let n = self.label_seq;
        self.label_seq += 1;
        n
    }

    /// `mov rsp, rbp; pop rbp; ret`, used both at the natural end of a
    /// function body and inline at every `return`.
    pub(crate) fn emit_epilogue(&mut self) {
        instr!(&mut self.out, "mov rsp, rbp");
        instr!(&mut self.out, "pop rbp");
        instr!(&mut self.out, "ret");
    }

    fn push_sentinel(&mut self) -> Result<()> {
        instr!(&mut self.out, "push 0xdb");
        Ok(())
    }

    /// Pushes the *address* of `expr`. Only `VarRef` and `Deref` are valid
    /// l-values; anything else (the parser already forbids this on the left
    /// of `=`, but `&expr` can still reach an invalid operand) is fatal.
    fn gen_lvalue(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::VarRef(var) => {
                match &var.storage {
                    Storage::Local { offset } => {
                        instr!(&mut self.out, "mov rax, rbp");
                        instr!(&mut self.out, "sub rax, {offset}");
                        instr!(&mut self.out, "push rax");
                    }
                    Storage::Global { label } => {
                        instr!(&mut self.out, "lea rax, [{label}]");
                        instr!(&mut self.out, "push rax");
                    }
                }
                Ok(())
            }
            ExprKind::Deref(inner) => self.gen_expr(inner),
            _ => Err(CodegenError::BadLvalue { span: expr.span }),
        }
    }

    fn gen_load(&mut self, ty: &Type, span: Span) -> Result<()> {
        let width = load_width(ty, span)?;
        instr!(&mut self.out, "pop rax");
        match width {
            Width::Byte => instr!(&mut self.out, "movsx rax, byte ptr [rax]"),
            Width::Dword => instr!(&mut self.out, "mov eax, dword ptr [rax]"),
            Width::Qword => instr!(&mut self.out, "mov rax, [rax]"),
        }
        instr!(&mut self.out, "push rax");
        Ok(())
    }

    fn gen_store(&mut self, ty: &Type, span: Span) -> Result<()> {
        let width = store_width(ty, span)?;
        instr!(&mut self.out, "pop rdi");
        instr!(&mut self.out, "pop rax");
        match width {
            Width::Byte => instr!(&mut self.out, "mov byte ptr [rax], dil"),
            Width::Dword => instr!(&mut self.out, "mov dword ptr [rax], edi"),
            Width::Qword => instr!(&mut self.out, "mov [rax], rdi"),
        }
        instr!(&mut self.out, "push rdi");
        Ok(())
    }

    pub(crate) fn gen_expr(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Num(n) => {
                instr!(&mut self.out, "push {n}");
                Ok(())
            }
            ExprKind::VarRef(var) => {
                self.gen_lvalue(expr)?;
                // Array-to-pointer decay: the address just pushed *is* the
                // value; loading through it would read the wrong thing.
                if matches!(var.ty, Type::Array(..)) {
                    Ok(())
                } else {
                    self.gen_load(&var.ty, expr.span)
                }
            }
            ExprKind::StringLit(id) => {
                instr!(&mut self.out, "lea rax, [{}]", string_label(*id));
                instr!(&mut self.out, "push rax");
                Ok(())
            }
            ExprKind::Addr(inner) => self.gen_lvalue(inner),
            ExprKind::Deref(inner) => {
                self.gen_expr(inner)?;
                let ty = type_of(expr)?;
                self.gen_load(&ty, expr.span)
            }
            ExprKind::Assign(lhs, rhs) => {
                self.gen_lvalue(lhs)?;
                self.gen_expr(rhs)?;
                let ty = type_of(lhs)?;
                self.gen_store(&ty, expr.span)
            }
            ExprKind::Add(lhs, rhs) => self.gen_add(expr, lhs, rhs),
            ExprKind::Sub(lhs, rhs) => self.gen_sub(expr, lhs, rhs),
            ExprKind::Mul(lhs, rhs) => self.gen_simple_binary(lhs, rhs, "imul rax, rdi"),
            ExprKind::Div(lhs, rhs) => {
                self.gen_expr(lhs)?;
                self.gen_expr(rhs)?;
                instr!(&mut self.out, "pop rdi");
                instr!(&mut self.out, "pop rax");
                instr!(&mut self.out, "cqo");
                instr!(&mut self.out, "idiv rdi");
                instr!(&mut self.out, "push rax");
                Ok(())
            }
            ExprKind::Eq(lhs, rhs) => self.gen_compare(lhs, rhs, "sete"),
            ExprKind::Ne(lhs, rhs) => self.gen_compare(lhs, rhs, "setne"),
            ExprKind::Lt(lhs, rhs) => self.gen_compare(lhs, rhs, "setl"),
            ExprKind::Le(lhs, rhs) => self.gen_compare(lhs, rhs, "setle"),
            ExprKind::Call(name, args) => self.gen_call(name, args, expr.span),
        }
    }

    /// `Add`: evaluate both sides, then scale whichever one is int-typed by
    /// the other side's element size when the other side is pointer-like,
    /// before the underlying integer add. Addition is commutative so it
    /// never matters which side ends up scaled. Re-running `type_of` on
    /// `expr` itself is what surfaces `pointer + pointer` as a
    /// `CodegenError::Type` here, since the parser never calls it eagerly
    /// on every node.
    fn gen_add(&mut self, expr: &Expr, lhs: &Expr, rhs: &Expr) -> Result<()> {
        type_of(expr)?;
        let lt = type_of(lhs)?;
        let rt = type_of(rhs)?;
        self.gen_expr(lhs)?;
        self.gen_expr(rhs)?;
        instr!(&mut self.out, "pop rdi");
        instr!(&mut self.out, "pop rax");
        if let Some(scale) = pointer_scale(&lt) {
            instr!(&mut self.out, "imul rdi, {scale}");
        } else if let Some(scale) = pointer_scale(&rt) {
            instr!(&mut self.out, "imul rax, {scale}");
        }
        instr!(&mut self.out, "add rax, rdi");
        instr!(&mut self.out, "push rax");
        Ok(())
    }

    /// `Sub`: three shapes per the type table. `int - int` is a plain
    /// subtraction. `pointer - int` scales the int side before subtracting,
    /// same as `Add`. `pointer - pointer` subtracts the raw addresses
    /// *first* and then divides the byte difference by the element size to
    /// get an element count; scaling before the subtraction, as `Add`
    /// does, would be wrong here since both operands are addresses, not
    /// counts. `int - pointer` is rejected by `type_of(expr)` before
    /// either shape is reached.
    fn gen_sub(&mut self, expr: &Expr, lhs: &Expr, rhs: &Expr) -> Result<()> {
        type_of(expr)?;
        let lt = type_of(lhs)?;
        let rt = type_of(rhs)?;
        self.gen_expr(lhs)?;
        self.gen_expr(rhs)?;
        instr!(&mut self.out, "pop rdi");
        instr!(&mut self.out, "pop rax");
        if lt.is_pointer_like() && rt.is_pointer_like() {
            let scale = pointer_scale(&lt).expect("pointer-like type has an element size");
            instr!(&mut self.out, "sub rax, rdi");
            instr!(&mut self.out, "cqo");
            instr!(&mut self.out, "mov rdi, {scale}");
            instr!(&mut self.out, "idiv rdi");
        } else {
            if let Some(scale) = pointer_scale(&lt) {
                instr!(&mut self.out, "imul rdi, {scale}");
            }
            instr!(&mut self.out, "sub rax, rdi");
        }
        instr!(&mut self.out, "push rax");
        Ok(())
    }

    fn gen_simple_binary(&mut self, lhs: &Expr, rhs: &Expr, op: &str) -> Result<()> {
        self.gen_expr(lhs)?;
        self.gen_expr(rhs)?;
        instr!(&mut self.out, "pop rdi");
        instr!(&mut self.out, "pop rax");
        instr!(&mut self.out, "{op}");
        instr!(&mut self.out, "push rax");
        Ok(())
    }

    fn gen_compare(&mut self, lhs: &Expr, rhs: &Expr, set: &str) -> Result<()> {
        self.gen_expr(lhs)?;
        self.gen_expr(rhs)?;
        instr!(&mut self.out, "pop rdi");
        instr!(&mut self.out, "pop rax");
        instr!(&mut self.out, "cmp rax, rdi");
        instr!(&mut self.out, "{set} al");
        instr!(&mut self.out, "movzb rax, al");
        instr!(&mut self.out, "push rax");
        Ok(())
    }

    /// Evaluates each argument left to right (pushing one value each), then
    /// pops them into argument registers in reverse so the first argument
    /// lands in `rdi`. The alignment branch keeps `rsp` 16-byte aligned at
    /// `call` regardless of how many values are currently on the stack.
    fn gen_call(&mut self, name: &str, args: &[Expr], span: Span) -> Result<()> {
        if args.len() > ARG_REGS.len() {
            return Err(CodegenError::TooManyArguments { span });
        }
        for arg in args {
            self.gen_expr(arg)?;
        }
        for i in (0..args.len()).rev() {
            instr!(&mut self.out, "pop {}", ARG_REGS[i][width_index(Width::Qword)]);
        }
        let n = self.next_label();
        instr!(&mut self.out, "mov rax, rsp");
        instr!(&mut self.out, "and rax, 15");
        instr!(&mut self.out, "jnz .Lcall{n}");
        instr!(&mut self.out, "call {name}");
        instr!(&mut self.out, "jmp .Lend{n}");
        label!(&mut self.out, ".Lcall{n}");
        instr!(&mut self.out, "sub rsp, 8");
        instr!(&mut self.out, "call {name}");
        instr!(&mut self.out, "add rsp, 8");
        label!(&mut self.out, ".Lend{n}");
        instr!(&mut self.out, "push rax");
        Ok(())
    }

    pub(crate) fn gen_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Expr(e) => self.gen_expr(e),
            Stmt::Null => self.push_sentinel(),
            Stmt::If(test, cons, alt) => self.gen_if(test, cons, alt.as_deref()),
            Stmt::While(test, body) => self.gen_while(test, body),
            Stmt::For(init, test, post, body) => {
                self.gen_for(init.as_ref(), test.as_ref(), post.as_ref(), body)
            }
            Stmt::Return(e) => self.gen_return(e),
            Stmt::Block(stmts) => self.gen_block(stmts),
        }
    }

    fn gen_if(&mut self, test: &Expr, cons: &Stmt, alt: Option<&Stmt>) -> Result<()> {
        let n = self.next_label();
        self.gen_expr(test)?;
        instr!(&mut self.out, "pop rax");
        instr!(&mut self.out, "cmp rax, 0");
        instr!(&mut self.out, "je  .Lelse{n}");
        self.gen_stmt(cons)?;
        instr!(&mut self.out, "jmp .Lend{n}");
        label!(&mut self.out, ".Lelse{n}");
        match alt {
            Some(stmt) => self.gen_stmt(stmt)?,
            None => self.push_sentinel()?,
        }
        label!(&mut self.out, ".Lend{n}");
        Ok(())
    }

    fn gen_while(&mut self, test: &Expr, body: &Stmt) -> Result<()> {
        let n = self.next_label();
        label!(&mut self.out, ".Lbegin{n}");
        self.gen_expr(test)?;
        instr!(&mut self.out, "pop rax");
        instr!(&mut self.out, "cmp rax, 0");
        instr!(&mut self.out, "je  .Lend{n}");
        self.gen_stmt(body)?;
        instr!(&mut self.out, "pop rax");
        instr!(&mut self.out, "jmp .Lbegin{n}");
        label!(&mut self.out, ".Lend{n}");
        self.push_sentinel()
    }

    fn gen_for(
        &mut self,
        init: Option<&Expr>,
        test: Option<&Expr>,
        post: Option<&Expr>,
        body: &Stmt,
    ) -> Result<()> {
        let n = self.next_label();
        if let Some(init) = init {
            self.gen_expr(init)?;
            instr!(&mut self.out, "pop rax");
        }
        label!(&mut self.out, ".Lbegin{n}");
        if let Some(test) = test {
            self.gen_expr(test)?;
            instr!(&mut self.out, "pop rax");
            instr!(&mut self.out, "cmp rax, 0");
            instr!(&mut self.out, "je  .Lend{n}");
        }
        self.gen_stmt(body)?;
        instr!(&mut self.out, "pop rax");
        if let Some(post) = post {
            self.gen_expr(post)?;
            instr!(&mut self.out, "pop rax");
        }
        instr!(&mut self.out, "jmp .Lbegin{n}");
        label!(&mut self.out, ".Lend{n}");
        self.push_sentinel()
    }

    fn gen_return(&mut self, e: &Expr) -> Result<()> {
        self.gen_expr(e)?;
        instr!(&mut self.out, "pop rax");
        self.emit_epilogue();
        Ok(())
    }

    fn gen_block(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.gen_stmt(stmt)?;
            instr!(&mut self.out, "pop rax");
        }
        self.push_sentinel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmini_par::Parser;

    fn gen_main_body(src: &str) -> String {
        let program = Parser::parse(src).expect("parse should succeed");
        let mut gen = Generator::new();
        gen.gen_stmt(&program.functions[0].body)
            .expect("codegen should succeed");
        gen.finish()
    }

    #[test]
    fn num_pushes_literal() {
        let asm = gen_main_body("int main() { return 0; 7; }");
        assert!(asm.contains("push 7"));
    }

    #[test]
    fn assignment_leaves_stored_value_on_stack() {
        let asm = gen_main_body("int main() { int a; a = 2; return a; }");
        assert!(asm.contains("mov [rax], rdi") || asm.contains("mov dword ptr"));
        assert!(asm.contains("push rdi"));
    }

    #[test]
    fn comparison_uses_movzb_widening() {
        let asm = gen_main_body("int main() { return 1 < 2; }");
        assert!(asm.contains("setl al"));
        assert!(asm.contains("movzb rax, al"));
    }

    #[test]
    fn division_uses_cqo_idiv() {
        let asm = gen_main_body("int main() { return 6 / 2; }");
        assert!(asm.contains("cqo"));
        assert!(asm.contains("idiv rdi"));
    }

    #[test]
    fn pointer_plus_int_scales_by_element_size() {
        let asm = gen_main_body("int main() { int a[3]; return *(a + 1); }");
        assert!(asm.contains("imul rdi, 4"));
    }

    #[test]
    fn pointer_minus_pointer_divides_byte_difference_by_element_size() {
        let asm = gen_main_body("int main() { int *p; int *q; return p - q; }");
        assert!(asm.contains("sub rax, rdi"));
        assert!(asm.contains("mov rdi, 4"));
        assert!(asm.contains("idiv rdi"));
    }

    #[test]
    fn pointer_plus_pointer_is_a_type_error() {
        let program = Parser::parse("int main() { int *p; int *q; return p + q; }").unwrap();
        let mut gen = Generator::new();
        let err = gen.gen_stmt(&program.functions[0].body).unwrap_err();
        assert!(matches!(err, CodegenError::Type(_)));
    }

    #[test]
    fn bad_lvalue_operand_of_addr_is_fatal() {
        let program = Parser::parse("int main() { return *&1; }").unwrap();
        let mut gen = Generator::new();
        let err = gen.gen_stmt(&program.functions[0].body).unwrap_err();
        assert!(matches!(err, CodegenError::BadLvalue { .. }));
    }

    #[test]
    fn if_without_else_pushes_sentinel_in_else_branch() {
        let asm = gen_main_body("int main() { if (1) { 2; } return 0; }");
        assert!(asm.contains("push 0xdb"));
    }

    #[test]
    fn call_with_too_many_arguments_is_fatal() {
        let program =
            Parser::parse("int main() { return f(1, 2, 3, 4, 5, 6, 7); }").unwrap();
        let mut gen = Generator::new();
        let err = gen.gen_stmt(&program.functions[0].body).unwrap_err();
        assert!(matches!(err, CodegenError::TooManyArguments { .. }));
    }
}
