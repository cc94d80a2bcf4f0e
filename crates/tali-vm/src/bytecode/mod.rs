// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Nils Ahrend

//! Bytecode format for the Tali VM.
//!
//! An instruction is one opcode word followed by zero, one or two operand
//! words. Opcodes occupy the low 8 bits of the leading word; the upper 56
//! bits are reserved and ignored by the decoder. Operands are stored as
//! whole words; addresses are word indices into the arena.

#[cfg(test)]
mod bytecode_test;

/// Bit mask selecting the opcode byte of an instruction word.
pub const OPCODE_MASK: u64 = 0xFF;

/// The instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    /// Stop execution, preserving all engine state.
    Halt = 0,
    /// Push the operand word.
    Push = 1,
    /// Pop and discard the top of stack.
    Pop = 2,
    /// Duplicate the top of stack.
    Dup = 3,
    /// Swap the top two words.
    Swap = 4,
    /// `a, b -> a + b` (wrapping).
    Add = 5,
    /// `a, b -> a - b` (wrapping).
    Sub = 6,
    /// `a, b -> a * b` (wrapping).
    Mul = 7,
    /// `a, b -> a / b`; division by zero faults.
    Div = 8,
    /// `a, b -> a % b`; modulo by zero faults.
    Mod = 9,
    /// Bitwise AND.
    And = 10,
    /// Bitwise OR.
    Or = 11,
    /// Bitwise XOR.
    Xor = 12,
    /// Logical shift left.
    Shl = 13,
    /// Logical shift right.
    Shr = 14,
    /// Arithmetic shift right (sign-extending).
    Ashr = 15,
    /// `a, b -> 1` if equal else `0`.
    Eq = 16,
    /// Unsigned `a < b`.
    Lt = 17,
    /// Unsigned `a > b`.
    Gt = 18,
    /// Unconditional jump to the operand address.
    Jmp = 19,
    /// Pop a condition; jump to the operand address if it is zero.
    Jz = 20,
    /// Call the operand address; second operand is the argument count.
    Call = 21,
    /// Call the address popped from the stack; operand is the argument count.
    CallInd = 22,
    /// Return from a call frame; operand is the argument count to discard.
    Ret = 23,
    /// Open a frame; operand is the number of frame slots to reserve.
    Enter = 24,
    /// Close the current frame; operand mirrors the matching ENTER.
    Leave = 25,
    /// Pop an address, push the word stored there.
    Load = 26,
    /// Pop an address, pop a value, store the value at the address.
    Store = 27,
    /// Pop a frame index, push the frame slot's value.
    BpLoad = 28,
    /// Pop a frame index, pop a value, store it in the frame slot.
    BpStore = 29,
    /// Pop a word and print its decimal representation.
    Print = 30,
    /// Pop an address and print the length-prefixed string stored there.
    PrintStr = 31,
    /// Pop a byte address, push the byte stored there.
    PeekByte = 32,
    /// Pop a byte address, pop a value, store its low byte there.
    PokeByte = 33,
    /// Pop a byte address, push the 32-bit value stored there.
    Peek32 = 34,
    /// Pop a byte address, pop a value, store its low 32 bits there.
    Poke32 = 35,
    /// Disable interrupt dispatch.
    Cli = 36,
    /// Enable interrupt dispatch.
    Sti = 37,
    /// Pop a return address, jump to it and re-enable interrupts.
    Iret = 38,
    /// Pop a handler address, pop a signal number, register the handler.
    SignalReg = 39,
}

impl Op {
    /// Number of distinct opcodes.
    pub const COUNT: usize = 40;

    /// Decode an instruction word's opcode byte.
    #[must_use]
    pub fn from_word(word: u64) -> Option<Self> {
        Self::from_u8((word & OPCODE_MASK) as u8)
    }

    /// Decode an opcode byte.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Halt,
            1 => Self::Push,
            2 => Self::Pop,
            3 => Self::Dup,
            4 => Self::Swap,
            5 => Self::Add,
            6 => Self::Sub,
            7 => Self::Mul,
            8 => Self::Div,
            9 => Self::Mod,
            10 => Self::And,
            11 => Self::Or,
            12 => Self::Xor,
            13 => Self::Shl,
            14 => Self::Shr,
            15 => Self::Ashr,
            16 => Self::Eq,
            17 => Self::Lt,
            18 => Self::Gt,
            19 => Self::Jmp,
            20 => Self::Jz,
            21 => Self::Call,
            22 => Self::CallInd,
            23 => Self::Ret,
            24 => Self::Enter,
            25 => Self::Leave,
            26 => Self::Load,
            27 => Self::Store,
            28 => Self::BpLoad,
            29 => Self::BpStore,
            30 => Self::Print,
            31 => Self::PrintStr,
            32 => Self::PeekByte,
            33 => Self::PokeByte,
            34 => Self::Peek32,
            35 => Self::Poke32,
            36 => Self::Cli,
            37 => Self::Sti,
            38 => Self::Iret,
            39 => Self::SignalReg,
            _ => return None,
        })
    }

    /// Number of operand words following the opcode word.
    #[must_use]
    pub const fn operands(self) -> usize {
        match self {
            Self::Push
            | Self::Jmp
            | Self::Jz
            | Self::CallInd
            | Self::Ret
            | Self::Enter
            | Self::Leave => 1,
            Self::Call => 2,
            _ => 0,
        }
    }

    /// Mnemonic used by the disassembler.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Halt => "HALT",
            Self::Push => "PUSH",
            Self::Pop => "POP",
            Self::Dup => "DUP",
            Self::Swap => "SWAP",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
            Self::Ashr => "ASHR",
            Self::Eq => "EQ",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Jmp => "JMP",
            Self::Jz => "JZ",
            Self::Call => "CALL",
            Self::CallInd => "CALL_IND",
            Self::Ret => "RET",
            Self::Enter => "ENTER",
            Self::Leave => "LEAVE",
            Self::Load => "LOAD",
            Self::Store => "STORE",
            Self::BpLoad => "BP_LOAD",
            Self::BpStore => "BP_STORE",
            Self::Print => "PRINT",
            Self::PrintStr => "PRINT_STR",
            Self::PeekByte => "PEEK_BYTE",
            Self::PokeByte => "POKE_BYTE",
            Self::Peek32 => "PEEK32",
            Self::Poke32 => "POKE32",
            Self::Cli => "CLI",
            Self::Sti => "STI",
            Self::Iret => "IRET",
            Self::SignalReg => "SIGNAL_REG",
        }
    }
}

impl From<Op> for u64 {
    fn from(op: Op) -> Self {
        op as Self
    }
}
