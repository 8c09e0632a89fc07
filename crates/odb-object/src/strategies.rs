//! proptest strategies shared by the object tests.

use odb_types::{ObjectId, ID_LEN};
use proptest::prelude::*;

use crate::signature::Signature;

pub(crate) fn arb_id() -> impl Strategy<Value = ObjectId> {
    any::<[u8; ID_LEN]>().prop_map(ObjectId::from_raw)
}

pub(crate) fn arb_signature() -> impl Strategy<Value = Signature> {
    (
        "[A-Za-z][A-Za-z .]{0,16}",
        "[a-z0-9._]{1,12}@[a-z]{1,8}\\.(org|com)",
        0i64..4_102_444_800,
        -720i32..=840,
    )
        .prop_map(|(name, email, time, offset)| Signature::new(&name, &email, time, offset))
}

/// Printable text with embedded blank lines.
pub(crate) fn arb_message() -> impl Strategy<Value = String> {
    "[ -~\n]{0,80}"
}
