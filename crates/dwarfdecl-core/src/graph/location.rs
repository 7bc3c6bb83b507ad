//! Member location expressions.
//!
//! `DW_AT_data_member_location` is either a constant or a tiny stack program
//! run with the structure's base address on the stack. Offsets are relative,
//! so we run it with a base of zero and read the offset off the top.

use smallvec::{smallvec, SmallVec};

/// One stack operation of a location program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationOp
{
    /// `DW_OP_constu`: push a constant
    Constu(u64),
    /// `DW_OP_plus_uconst`: add a constant to the top of the stack
    PlusUconst(u64),
    /// `DW_OP_plus`: pop two, push their sum
    Plus,
    /// Anything else; evaluation gives up
    Unsupported,
}

/// A member location program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationExpr
{
    ops: SmallVec<[LocationOp; 2]>,
}

impl LocationExpr
{
    /// A plain `DW_AT_data_member_location` constant.
    #[must_use]
    pub fn offset(offset: u64) -> Self
    {
        Self { ops: smallvec![LocationOp::PlusUconst(offset)] }
    }

    #[must_use]
    pub fn from_ops(ops: impl IntoIterator<Item = LocationOp>) -> Self
    {
        Self { ops: ops.into_iter().collect() }
    }

    #[must_use]
    pub fn ops(&self) -> &[LocationOp]
    {
        &self.ops
    }

    /// Evaluate relative to a zero base address.
    ///
    /// Returns `None` for programs we cannot run: unsupported operations,
    /// stack underflow or arithmetic overflow.
    #[must_use]
    pub fn evaluate(&self) -> Option<u64>
    {
        let mut stack: SmallVec<[u64; 4]> = smallvec![0];
        for op in &self.ops {
            match *op {
                LocationOp::Constu(value) => stack.push(value),
                LocationOp::PlusUconst(value) => {
                    let top = stack.pop()?;
                    stack.push(top.checked_add(value)?);
                }
                LocationOp::Plus => {
                    let rhs = stack.pop()?;
                    let lhs = stack.pop()?;
                    stack.push(lhs.checked_add(rhs)?);
                }
                LocationOp::Unsupported => return None,
            }
        }
        stack.last().copied()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_constant_offset()
    {
        assert_eq!(LocationExpr::offset(24).evaluate(), Some(24));
    }

    #[test]
    fn test_constu_plus()
    {
        let expr = LocationExpr::from_ops([LocationOp::Constu(8), LocationOp::Plus]);
        assert_eq!(expr.evaluate(), Some(8));
    }

    #[test]
    fn test_unsupported_is_indeterminate()
    {
        let expr = LocationExpr::from_ops([LocationOp::Constu(8), LocationOp::Unsupported]);
        assert_eq!(expr.evaluate(), None);
    }

    #[test]
    fn test_underflow_is_indeterminate()
    {
        let expr = LocationExpr::from_ops([LocationOp::Plus]);
        assert_eq!(expr.evaluate(), None);
    }
}
