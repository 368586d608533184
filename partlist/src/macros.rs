// SPDX-License-Identifier: MIT

/// Defines the set of known MBR partition type codes.
///
/// Generates:
/// - `enum PartitionType` with one variant per entry plus `Unknown(u8)`,
/// - `PartitionType::from_byte` / `PartitionType::as_byte`,
/// - `PartitionType::name` and a `Display` impl using the description,
/// - `PARTITION_TYPES`, the `(code, description)` table in declaration order.
///
/// ```ignore
/// define_partition_types! {
///     Fat12 => "FAT12", 0x01,
///     Linux => "Linux", 0x83,
/// }
/// ```
///
/// Codes must be unique literals.
macro_rules! define_partition_types {
    (
        $(
            $name:ident => $desc:expr, $code:literal
        ),+ $(,)?
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PartitionType {
            $(
                #[doc = $desc]
                $name,
            )+
            Unknown(u8),
        }

        /// `(code, description)` for every known type.
        pub const PARTITION_TYPES: &[(u8, &str)] = &[$(($code, $desc),)+];

        impl PartitionType {
            pub const fn from_byte(code: u8) -> Self {
                match code {
                    $($code => Self::$name,)+
                    other => Self::Unknown(other),
                }
            }

            pub const fn as_byte(&self) -> u8 {
                match self {
                    $(Self::$name => $code,)+
                    Self::Unknown(code) => *code,
                }
            }

            pub const fn name(&self) -> &'static str {
                match self {
                    $(Self::$name => $desc,)+
                    Self::Unknown(_) => "Unknown",
                }
            }
        }

        impl From<u8> for PartitionType {
            fn from(code: u8) -> Self {
                Self::from_byte(code)
            }
        }

        impl From<PartitionType> for u8 {
            fn from(ty: PartitionType) -> Self {
                ty.as_byte()
            }
        }

        impl core::fmt::Display for PartitionType {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    Self::Unknown(code) => write!(f, "Unknown (0x{code:02X})"),
                    known => f.write_str(known.name()),
                }
            }
        }
    };
}
