#![warn(unused_crate_dependencies)]

cfg_if::cfg_if! {
    if #[cfg(feature = "bn254")] {
        mod generic_ark;

        /// The field the compiler works over, selected by crate feature.
        pub type FieldElement = generic_ark::FieldElement<ark_bn254::Fr>;
    } else if #[cfg(feature = "bls12_381")] {
        mod generic_ark;

        /// The field the compiler works over, selected by crate feature.
        pub type FieldElement = generic_ark::FieldElement<ark_bls12_381::Fr>;
    } else {
        compile_error!("please specify a field to compile with");
    }
}
