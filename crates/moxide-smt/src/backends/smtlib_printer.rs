use num::{BigRational, Signed};

use moxide_ir::{Op, Sort, Term};

/// Print a symbol, quoting it when it is not a simple SMT-LIB2 symbol.
///
/// Primed names such as `next(x)` contain parentheses and must be quoted;
/// timed names such as `x@3` are simple symbols already.
pub fn print_symbol(name: &str) -> String {
    let simple = !name.is_empty()
        && !name.chars().next().is_some_and(|c| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c));
    if simple {
        name.to_string()
    } else {
        format!("|{name}|")
    }
}

/// Print a sort in SMT-LIB2 syntax.
pub fn sort_to_smtlib(sort: &Sort) -> String {
    sort.to_string()
}

fn rational_to_smtlib(r: &BigRational) -> String {
    let abs = r.abs();
    let body = if abs.is_integer() {
        format!("{}.0", abs.numer())
    } else {
        format!("(/ {} {})", abs.numer(), abs.denom())
    };
    if r.is_negative() {
        format!("(- {body})")
    } else {
        body
    }
}

fn op_head(op: &Op) -> String {
    let simple = match op {
        Op::Not => "not",
        Op::Implies => "=>",
        Op::And => "and",
        Op::Or => "or",
        Op::Xor => "xor",
        Op::Eq => "=",
        Op::Ite => "ite",
        Op::Neg | Op::Sub => "-",
        Op::Add => "+",
        Op::Mul => "*",
        Op::Div => "/",
        Op::IntDiv => "div",
        Op::Mod => "mod",
        Op::Abs => "abs",
        Op::Le => "<=",
        Op::Lt => "<",
        Op::Ge => ">=",
        Op::Gt => ">",
        Op::ToReal => "to_real",
        Op::ToInt => "to_int",
        Op::IsInt => "is_int",
        Op::BvAdd => "bvadd",
        Op::BvSub => "bvsub",
        Op::BvMul => "bvmul",
        Op::BvUdiv => "bvudiv",
        Op::BvSdiv => "bvsdiv",
        Op::BvUrem => "bvurem",
        Op::BvSrem => "bvsrem",
        Op::BvAnd => "bvand",
        Op::BvOr => "bvor",
        Op::BvXor => "bvxor",
        Op::BvNot => "bvnot",
        Op::BvNeg => "bvneg",
        Op::BvShl => "bvshl",
        Op::BvLshr => "bvlshr",
        Op::BvAshr => "bvashr",
        Op::BvUlt => "bvult",
        Op::BvUle => "bvule",
        Op::BvUgt => "bvugt",
        Op::BvUge => "bvuge",
        Op::BvSlt => "bvslt",
        Op::BvSle => "bvsle",
        Op::BvSgt => "bvsgt",
        Op::BvSge => "bvsge",
        Op::Concat => "concat",
        Op::Select => "select",
        Op::Store => "store",
        Op::Divisible(n) => return format!("(_ divisible {n})"),
        Op::Extract { high, low } => return format!("(_ extract {high} {low})"),
        Op::ZeroExtend(n) => return format!("(_ zero_extend {n})"),
        Op::SignExtend(n) => return format!("(_ sign_extend {n})"),
        Op::RotateLeft(n) => return format!("(_ rotate_left {n})"),
        Op::RotateRight(n) => return format!("(_ rotate_right {n})"),
    };
    simple.to_string()
}

/// Print a term in SMT-LIB2 syntax.
pub fn to_smtlib(term: &Term) -> String {
    match term {
        Term::Var(v) => print_symbol(&v.name),
        Term::BoolLit(b) => b.to_string(),
        Term::IntLit(n) => {
            if *n < 0 {
                format!("(- {})", n.unsigned_abs())
            } else {
                n.to_string()
            }
        }
        Term::RealLit(r) => rational_to_smtlib(r),
        Term::BvLit { bits, width } => {
            format!("#b{bits:0width$b}", width = *width as usize)
        }
        Term::App(op, args) => match (op, args.len()) {
            (Op::And, 0) => "true".to_string(),
            (Op::Or, 0) => "false".to_string(),
            (_, 0) => format!("({})", op_head(op)),
            _ => {
                let inner: Vec<String> = args.iter().map(to_smtlib).collect();
                format!("({} {})", op_head(op), inner.join(" "))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moxide_ir::{next_var, Variable};
    use num::BigInt;

    #[test]
    fn print_simple_term() {
        let x = Variable::new("x", Sort::Int);
        let term = Term::var(x).add(Term::int(1)).ge(Term::int(0));
        assert_eq!(to_smtlib(&term), "(>= (+ x 1) 0)");
    }

    #[test]
    fn print_negative_int_literal() {
        assert_eq!(to_smtlib(&Term::int(-3)), "(- 3)");
    }

    #[test]
    fn print_primed_symbol_quoted() {
        let x = Variable::new("x", Sort::Int);
        let term = Term::var(next_var(&x)).eq(Term::int(0));
        assert_eq!(to_smtlib(&term), "(= |next(x)| 0)");
    }

    #[test]
    fn timed_symbol_needs_no_quoting() {
        assert_eq!(print_symbol("x@3"), "x@3");
        assert_eq!(print_symbol("next(x)"), "|next(x)|");
    }

    #[test]
    fn print_rational_literals() {
        let half = BigRational::new(BigInt::from(1), BigInt::from(2));
        assert_eq!(to_smtlib(&Term::real(half)), "(/ 1 2)");
        let neg_two = BigRational::from_integer(BigInt::from(-2));
        assert_eq!(to_smtlib(&Term::real(neg_two)), "(- 2.0)");
    }

    #[test]
    fn print_indexed_operators() {
        let b = Variable::new("b", Sort::BitVec(8));
        let term = Term::App(
            Op::Extract { high: 3, low: 0 },
            vec![Term::var(b.clone())],
        );
        assert_eq!(to_smtlib(&term), "((_ extract 3 0) b)");
        let term = Term::App(Op::ZeroExtend(8), vec![Term::var(b)]);
        assert_eq!(to_smtlib(&term), "((_ zero_extend 8) b)");
    }

    #[test]
    fn print_bv_literal_padded_to_width() {
        assert_eq!(to_smtlib(&Term::bv(5, 8)), "#b00000101");
    }

    #[test]
    fn empty_connectives_print_as_units() {
        assert_eq!(to_smtlib(&Term::App(Op::And, vec![])), "true");
        assert_eq!(to_smtlib(&Term::App(Op::Or, vec![])), "false");
    }
}
