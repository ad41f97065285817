use crate::identifier::Identifier;
use crate::instance::ErrorPtr;
use itertools::Itertools;
use thiserror::Error;

fn requested_by(requesters: &[Identifier]) -> String {
    if requesters.is_empty() {
        String::new()
    } else {
        format!(" (requested by: {})", requesters.iter().join(" -> "))
    }
}

/// Errors related to declaring components in modules and sealing environments.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum DeclarationError {
    #[error("Identifier {identifier} is declared more than once in module '{module}'")]
    DuplicateDeclaration { identifier: Identifier, module: String },
    #[error(
        "Identifier {identifier} is declared by both '{existing_module}' and '{conflicting_module}' without an override"
    )]
    Conflict {
        identifier: Identifier,
        existing_module: String,
        conflicting_module: String,
    },
}

/// Errors related to resolving instances from an environment.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Cannot find a declaration for {identifier}{}", requested_by(.requesters))]
    UnresolvedDependency {
        identifier: Identifier,
        /// Identifiers under construction on the requesting thread, outermost first.
        requesters: Vec<Identifier>,
    },
    #[error("Dependency cycle detected: {}", .chain.iter().join(" -> "))]
    DependencyCycle { chain: Vec<Identifier> },
    #[error("Error constructing {identifier}: {source}")]
    Construction {
        identifier: Identifier,
        #[source]
        source: ErrorPtr,
    },
    #[error("Instance declared as {0} is not compatible with the requested type")]
    IncompatibleInstance(Identifier),
    #[error("The environment owning {0} has already been dropped")]
    EnvironmentDropped(Identifier),
    #[error("Cannot resolve {0} from an environment which has been torn down")]
    TornDown(Identifier),
}

impl ResolutionError {
    /// Maps a failure returned by the factory of `identifier`. Resolution errors raised by nested
    /// lookups already name the failing identifier, so they are passed through unchanged.
    pub(crate) fn from_factory(identifier: &Identifier, error: ErrorPtr) -> Self {
        match error.downcast::<ResolutionError>() {
            Ok(error) => *error,
            Err(source) => Self::Construction {
                identifier: identifier.clone(),
                source,
            },
        }
    }

    /// Returns the identifier this error is about. For cycles, this is the identifier closing the
    /// cycle.
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            Self::UnresolvedDependency { identifier, .. }
            | Self::Construction { identifier, .. }
            | Self::IncompatibleInstance(identifier)
            | Self::EnvironmentDropped(identifier)
            | Self::TornDown(identifier) => Some(identifier),
            Self::DependencyCycle { chain } => chain.last(),
        }
    }
}

/// Error returned by teardown, when some release hooks failed. All hooks are run regardless of
/// previous failures.
#[derive(Error, Debug)]
#[error("Failed to release {}", .failures.iter().map(|(identifier, error)| format!("{identifier}: {error}")).join(", "))]
pub struct TeardownError {
    pub failures: Vec<(Identifier, ErrorPtr)>,
}

#[cfg(test)]
mod tests {
    use crate::error::ResolutionError;
    use crate::identifier::Identifier;
    use crate::instance::ErrorPtr;

    #[test]
    fn should_wrap_user_errors() {
        let identifier = Identifier::of::<i8>();
        let error = ResolutionError::from_factory(&identifier, ErrorPtr::from("boom"));

        assert!(matches!(
            error,
            ResolutionError::Construction { identifier: ref id, .. } if *id == identifier
        ));
        assert_eq!(error.to_string(), "Error constructing i8: boom");
    }

    #[test]
    fn should_pass_nested_resolution_errors_through() {
        let missing = Identifier::of::<u8>();
        let nested = ResolutionError::UnresolvedDependency {
            identifier: missing.clone(),
            requesters: vec![Identifier::of::<i8>()],
        };

        let error = ResolutionError::from_factory(&Identifier::of::<i8>(), Box::new(nested));
        assert_eq!(error.identifier(), Some(&missing));
        assert_eq!(
            error.to_string(),
            "Cannot find a declaration for u8 (requested by: i8)"
        );
    }

    #[test]
    fn should_render_cycle_chain() {
        let error = ResolutionError::DependencyCycle {
            chain: vec![
                Identifier::of::<i8>(),
                Identifier::named::<u8>("x"),
                Identifier::of::<i8>(),
            ],
        };

        assert_eq!(
            error.to_string(),
            "Dependency cycle detected: i8 -> u8 (x) -> i8"
        );
    }
}
