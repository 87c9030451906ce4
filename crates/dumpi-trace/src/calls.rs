//! Call-label enumeration and the argument-shape registry.
//!
//! Every profiled call has a stable 16-bit code and an ordered argument shape. The encoder and the
//! decoder both walk [`CallType::shape`], so a new call is added by appending one line to the
//! table at the bottom of this file. Codes are dense and assigned in table order; the code one
//! past the last entry is [`CallType::END_OF_STREAM`].

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallType(pub u16);

/// Primitive kinds an argument can take on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// `i32`.
    Int,
    /// `i64`.
    Int64,
    /// Hashed opaque handle or well-known sentinel, stored as `i32`.
    Handle,
    /// `u32` length then `i32` elements.
    IntArray,
    /// `u32` length then `i32` handles.
    HandleArray,
    /// `u32` length then UTF-8 bytes.
    Str,
    /// `u32` length then strings.
    StrArray,
    /// Four independently length-prefixed arrays; only present when the record's mask has STATUS.
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallShape {
    pub call: CallType,
    pub label: &'static str,
    pub args: &'static [ArgSpec],
}

impl CallType {
    /// Number of registered call types; also the length of the footer counter arrays.
    pub const COUNT: usize = REGISTRY.len();

    /// Terminates the call stream. Never has a shape.
    pub const END_OF_STREAM: CallType = CallType(REGISTRY.len() as u16);

    pub fn shape(self) -> Option<&'static CallShape> {
        REGISTRY.get(usize::from(self.0))
    }

    pub fn name(self) -> Option<&'static str> {
        self.shape().map(|shape| shape.label)
    }

    pub fn is_end_of_stream(self) -> bool {
        self == CallType::END_OF_STREAM
    }

    pub fn all() -> impl Iterator<Item = CallType> {
        REGISTRY.iter().map(|shape| shape.call)
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            write!(f, "{name}({})", self.0)
        } else if self.is_end_of_stream() {
            write!(f, "END_OF_STREAM({})", self.0)
        } else {
            write!(f, "CallType({})", self.0)
        }
    }
}

macro_rules! call_types {
    ($( $code:literal $ident:ident $label:literal [ $( $arg:ident : $kind:ident ),* $(,)? ] )*) => {
        impl CallType {
            $( pub const $ident: CallType = CallType($code); )*
        }

        const REGISTRY: &[CallShape] = &[
            $(
                CallShape {
                    call: CallType($code),
                    label: $label,
                    args: &[ $( ArgSpec { name: stringify!($arg), kind: ArgKind::$kind } ),* ],
                },
            )*
        ];
    };
}

call_types! {
    0 SEND "MPI_Send" [count: Int, datatype: Handle, dest: Int, tag: Int, comm: Handle]
    1 RECV "MPI_Recv" [count: Int, datatype: Handle, source: Int, tag: Int, comm: Handle, status: Status]
    2 ISEND "MPI_Isend" [count: Int, datatype: Handle, dest: Int, tag: Int, comm: Handle, request: Handle]
    3 IRECV "MPI_Irecv" [count: Int, datatype: Handle, source: Int, tag: Int, comm: Handle, request: Handle]
    4 SSEND "MPI_Ssend" [count: Int, datatype: Handle, dest: Int, tag: Int, comm: Handle]
    5 RSEND "MPI_Rsend" [count: Int, datatype: Handle, dest: Int, tag: Int, comm: Handle]
    6 BSEND "MPI_Bsend" [count: Int, datatype: Handle, dest: Int, tag: Int, comm: Handle]
    7 SENDRECV "MPI_Sendrecv" [
        sendcount: Int, sendtype: Handle, dest: Int, sendtag: Int,
        recvcount: Int, recvtype: Handle, source: Int, recvtag: Int,
        comm: Handle, status: Status,
    ]
    8 WAIT "MPI_Wait" [request: Handle, status: Status]
    9 WAITALL "MPI_Waitall" [count: Int, requests: HandleArray, statuses: Status]
    10 WAITANY "MPI_Waitany" [count: Int, requests: HandleArray, index: Int, status: Status]
    11 WAITSOME "MPI_Waitsome" [
        incount: Int, requests: HandleArray, outcount: Int, indices: IntArray, statuses: Status,
    ]
    12 TEST "MPI_Test" [request: Handle, flag: Int, status: Status]
    13 TESTALL "MPI_Testall" [count: Int, requests: HandleArray, flag: Int, statuses: Status]
    14 PROBE "MPI_Probe" [source: Int, tag: Int, comm: Handle, status: Status]
    15 IPROBE "MPI_Iprobe" [source: Int, tag: Int, comm: Handle, flag: Int, status: Status]
    16 GET_COUNT "MPI_Get_count" [status: Status, datatype: Handle, count: Int]
    17 BARRIER "MPI_Barrier" [comm: Handle]
    18 BCAST "MPI_Bcast" [count: Int, datatype: Handle, root: Int, comm: Handle]
    19 REDUCE "MPI_Reduce" [count: Int, datatype: Handle, op: Handle, root: Int, comm: Handle]
    20 ALLREDUCE "MPI_Allreduce" [count: Int, datatype: Handle, op: Handle, comm: Handle]
    21 GATHER "MPI_Gather" [
        sendcount: Int, sendtype: Handle, recvcount: Int, recvtype: Handle, root: Int, comm: Handle,
    ]
    22 GATHERV "MPI_Gatherv" [
        sendcount: Int, sendtype: Handle, recvcounts: IntArray, displs: IntArray,
        recvtype: Handle, root: Int, comm: Handle,
    ]
    23 SCATTER "MPI_Scatter" [
        sendcount: Int, sendtype: Handle, recvcount: Int, recvtype: Handle, root: Int, comm: Handle,
    ]
    24 ALLGATHER "MPI_Allgather" [
        sendcount: Int, sendtype: Handle, recvcount: Int, recvtype: Handle, comm: Handle,
    ]
    25 ALLTOALL "MPI_Alltoall" [
        sendcount: Int, sendtype: Handle, recvcount: Int, recvtype: Handle, comm: Handle,
    ]
    26 ALLTOALLV "MPI_Alltoallv" [
        sendcounts: IntArray, senddispls: IntArray, sendtype: Handle,
        recvcounts: IntArray, recvdispls: IntArray, recvtype: Handle, comm: Handle,
    ]
    27 REDUCE_SCATTER "MPI_Reduce_scatter" [
        recvcounts: IntArray, datatype: Handle, op: Handle, comm: Handle,
    ]
    28 SCAN "MPI_Scan" [count: Int, datatype: Handle, op: Handle, comm: Handle]
    29 COMM_SIZE "MPI_Comm_size" [comm: Handle, size: Int]
    30 COMM_RANK "MPI_Comm_rank" [comm: Handle, rank: Int]
    31 COMM_DUP "MPI_Comm_dup" [comm: Handle, newcomm: Handle]
    32 COMM_SPLIT "MPI_Comm_split" [comm: Handle, color: Int, key: Int, newcomm: Handle]
    33 COMM_FREE "MPI_Comm_free" [comm: Handle]
    34 COMM_SET_NAME "MPI_Comm_set_name" [comm: Handle, name: Str]
    35 CART_CREATE "MPI_Cart_create" [
        comm_old: Handle, ndims: Int, dims: IntArray, periods: IntArray, reorder: Int,
        comm_cart: Handle,
    ]
    36 TYPE_CONTIGUOUS "MPI_Type_contiguous" [count: Int, oldtype: Handle, newtype: Handle]
    37 TYPE_VECTOR "MPI_Type_vector" [
        count: Int, blocklength: Int, stride: Int, oldtype: Handle, newtype: Handle,
    ]
    38 TYPE_COMMIT "MPI_Type_commit" [datatype: Handle]
    39 TYPE_FREE "MPI_Type_free" [datatype: Handle]
    40 TYPE_SIZE "MPI_Type_size" [datatype: Handle, size: Int]
    41 INIT "MPI_Init" [argc: Int, argv: StrArray]
    42 INIT_THREAD "MPI_Init_thread" [argc: Int, argv: StrArray, required: Int, provided: Int]
    43 FINALIZE "MPI_Finalize" []
    44 INITIALIZED "MPI_Initialized" [result: Int]
    45 ABORT "MPI_Abort" [comm: Handle, errorcode: Int]
    46 WTIME "MPI_Wtime" []
    47 PCONTROL "MPI_Pcontrol" [level: Int]
    48 FILE_WRITE_AT "MPI_File_write_at" [
        file: Handle, offset: Int64, count: Int, datatype: Handle, status: Status,
    ]
    49 GET_PROCESSOR_NAME "MPI_Get_processor_name" [name: Str, resultlen: Int]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_dense_and_match_table_order() {
        for (idx, shape) in REGISTRY.iter().enumerate() {
            assert_eq!(usize::from(shape.call.0), idx, "{}", shape.label);
        }
    }

    #[test]
    fn end_of_stream_has_no_shape() {
        assert_eq!(usize::from(CallType::END_OF_STREAM.0), CallType::COUNT);
        assert!(CallType::END_OF_STREAM.shape().is_none());
        assert_eq!(CallType::END_OF_STREAM.to_string(), "END_OF_STREAM(50)");
    }

    #[test]
    fn labels_are_unique() {
        let mut labels: Vec<_> = REGISTRY.iter().map(|shape| shape.label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), CallType::COUNT);
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(CallType::WAITALL.to_string(), "MPI_Waitall(9)");
        assert_eq!(CallType(9999).to_string(), "CallType(9999)");
    }
}
