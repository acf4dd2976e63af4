use std::{fmt, str::FromStr};

use super::ModelFactory;
use crate::{
    ZooError,
    models::{
        ApogeeBcnn, ApogeeCnn, ApogeeCvae, Architecture, Cifar10Cnn, Galaxy10Cnn, Galaxy10Gan,
        GalaxyGan2017, MnistBcnn, StarNet2017,
    },
};

/// The architectures shipped with the zoo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinArchitecture {
    ApogeeCnn,
    ApogeeBcnn,
    ApogeeCvae,
    Cifar10Cnn,
    Galaxy10Cnn,
    MnistBcnn,
    StarNet2017,
    GalaxyGan2017,
    Galaxy10Gan,
}

impl BuiltinArchitecture {
    pub const ALL: [Self; 9] = [
        Self::ApogeeCnn,
        Self::ApogeeBcnn,
        Self::ApogeeCvae,
        Self::Cifar10Cnn,
        Self::Galaxy10Cnn,
        Self::MnistBcnn,
        Self::StarNet2017,
        Self::GalaxyGan2017,
        Self::Galaxy10Gan,
    ];

    /// Looks up an identifier, matching case-sensitively.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let builtin = match identifier {
            "ApogeeCNN" => Self::ApogeeCnn,
            "ApogeeBCNN" => Self::ApogeeBcnn,
            "ApogeeCVAE" => Self::ApogeeCvae,
            "Cifar10CNN" => Self::Cifar10Cnn,
            "Galaxy10CNN" => Self::Galaxy10Cnn,
            "MNIST_BCNN" => Self::MnistBcnn,
            "StarNet2017" => Self::StarNet2017,
            "GalaxyGAN2017" => Self::GalaxyGan2017,
            "Galaxy10GAN" => Self::Galaxy10Gan,
            _ => return None,
        };

        Some(builtin)
    }

    pub fn identifier(self) -> &'static str {
        match self {
            Self::ApogeeCnn => "ApogeeCNN",
            Self::ApogeeBcnn => "ApogeeBCNN",
            Self::ApogeeCvae => "ApogeeCVAE",
            Self::Cifar10Cnn => "Cifar10CNN",
            Self::Galaxy10Cnn => "Galaxy10CNN",
            Self::MnistBcnn => "MNIST_BCNN",
            Self::StarNet2017 => "StarNet2017",
            Self::GalaxyGan2017 => "GalaxyGAN2017",
            Self::Galaxy10Gan => "Galaxy10GAN",
        }
    }

    pub fn factory(self) -> ModelFactory {
        match self {
            Self::ApogeeCnn => boxed::<ApogeeCnn>,
            Self::ApogeeBcnn => boxed::<ApogeeBcnn>,
            Self::ApogeeCvae => boxed::<ApogeeCvae>,
            Self::Cifar10Cnn => boxed::<Cifar10Cnn>,
            Self::Galaxy10Cnn => boxed::<Galaxy10Cnn>,
            Self::MnistBcnn => boxed::<MnistBcnn>,
            Self::StarNet2017 => boxed::<StarNet2017>,
            Self::GalaxyGan2017 => boxed::<GalaxyGan2017>,
            Self::Galaxy10Gan => boxed::<Galaxy10Gan>,
        }
    }

    pub fn construct(self) -> Box<dyn Architecture> {
        self.factory()()
    }
}

fn boxed<A: Architecture + Default + 'static>() -> Box<dyn Architecture> {
    Box::new(A::default())
}

impl FromStr for BuiltinArchitecture {
    type Err = ZooError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_identifier(s).ok_or_else(|| ZooError::UnknownIdentifier(s.to_string()))
    }
}

impl fmt::Display for BuiltinArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_resolves_to_itself() {
        for builtin in BuiltinArchitecture::ALL {
            let parsed: BuiltinArchitecture = builtin.identifier().parse().unwrap();
            assert_eq!(parsed, builtin);
            assert_eq!(builtin.construct().identifier(), builtin.identifier());
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(BuiltinArchitecture::from_identifier("apogeecnn"), None);
        assert!(matches!(
            "NotARealModel".parse::<BuiltinArchitecture>(),
            Err(ZooError::UnknownIdentifier(id)) if id == "NotARealModel"
        ));
    }
}
