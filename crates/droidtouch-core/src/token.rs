//! Case-insensitive keyword tokens.
//!
//! Directions, network modes, GSM states and the like arrive as free-form
//! strings from the CLI and from scenario files. [`match_token`] checks them
//! against an allow-list, and the `token_enum!` macro turns an allow-list
//! into a typed enum whose `FromStr`/serde implementations go through it.

use crate::gesture::GestureError;

/// Matches `token` case-insensitively against `allowed`, returning the
/// allow-list's canonical spelling.
///
/// `kind` names the parameter in the error message (e.g. `"direction"`).
pub fn match_token<'a>(token: &str, kind: &str, allowed: &[&'a str]) -> Result<&'a str, GestureError> {
    let wanted = token.trim();
    allowed
        .iter()
        .copied()
        .find(|candidate| candidate.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| {
            GestureError::InvalidParameter(format!(
                "invalid {kind} '{token}': expected one of {}",
                allowed.join(", ")
            ))
        })
}

/// Declares a fieldless enum backed by lowercase tokens.
///
/// Generates `TOKENS`, `ALL`, `as_str`, `Display`, `FromStr` and serde
/// support (serialized as the token, deserialized case-insensitively).
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $token:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Accepted tokens, in declaration order.
            pub const TOKENS: &'static [&'static str] = &[$($token),+];

            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The canonical token for this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $token ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::gesture::GestureError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let token = $crate::token::match_token(s, $kind, Self::TOKENS)?;
                Self::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str() == token)
                    .ok_or_else(|| $crate::gesture::GestureError::InvalidParameter(
                        format!("invalid {} '{}'", $kind, s),
                    ))
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::gesture::GestureError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.as_str()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    token_enum! {
        enum Flavor as "flavor" {
            Sweet => "sweet",
            Sour => "sour",
        }
    }

    #[test]
    fn match_is_case_insensitive_and_trimmed() {
        assert_eq!(match_token(" SWEET ", "flavor", &["sweet", "sour"]).unwrap(), "sweet");
    }

    #[test]
    fn unknown_token_names_the_kind() {
        let err = match_token("bitter", "flavor", &["sweet", "sour"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("flavor"));
        assert!(msg.contains("bitter"));
        assert!(msg.contains("sweet, sour"));
    }

    #[test]
    fn generated_enum_parses_and_displays() {
        let flavor: Flavor = "Sour".parse().unwrap();
        assert_eq!(flavor, Flavor::Sour);
        assert_eq!(flavor.to_string(), "sour");
        assert_eq!(Flavor::TOKENS, &["sweet", "sour"]);
        assert!("umami".parse::<Flavor>().is_err());
    }

    #[test]
    fn generated_enum_serde_uses_tokens() {
        assert_eq!(serde_json::to_string(&Flavor::Sweet).unwrap(), "\"sweet\"");
        let parsed: Flavor = serde_json::from_str("\"SWEET\"").unwrap();
        assert_eq!(parsed, Flavor::Sweet);
        assert!(serde_json::from_str::<Flavor>("\"salty\"").is_err());
    }
}
