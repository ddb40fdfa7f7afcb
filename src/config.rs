//! Engine configuration.
//!
//! The configuration is a JSON document with one section per pipeline stage.
//! Every key is optional and falls back to the defaults below; unknown keys
//! are rejected so a typo never silently becomes a default. `Config::validate`
//! runs at engine construction and is the only place a `Configuration` error
//! originates.

use crate::util::{ProdMatchError, ProdMatchResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Preprocessing switches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PreprocessConfig {
    /// Edge-preserving denoise before matching.
    pub denoise: bool,
    /// CLAHE on the lightness channel.
    pub enhance_contrast: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            denoise: true,
            enhance_contrast: true,
        }
    }
}

/// Color gate thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ColorGateConfig {
    /// Minimum hue/saturation histogram correlation.
    pub hsv_corr_min: f32,
    /// Maximum median delta-E (8-bit Lab units) over chromatic pixels.
    #[serde(rename = "deltaE50Max")]
    pub delta_e50_max: f32,
    /// Saturation (8-bit scale) at which a pixel counts as chromatic.
    pub chromatic_saturation_min: f32,
}

impl Default for ColorGateConfig {
    fn default() -> Self {
        Self {
            hsv_corr_min: 0.92,
            delta_e50_max: 6.0,
            chromatic_saturation_min: 40.0,
        }
    }
}

/// Perceptual hash settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PhashConfig {
    pub enabled: bool,
    /// Side of the low-frequency DCT block; the hash has `hash_size²` bits.
    pub hash_size: usize,
    /// Maximum Hamming distance accepted as a match.
    pub hamming_threshold: u32,
}

impl Default for PhashConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hash_size: 8,
            hamming_threshold: 10,
        }
    }
}

/// Feature matcher settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct OrbConfig {
    pub enabled: bool,
    /// Maximum number of keypoints per image.
    pub n_features: usize,
    /// Ratio-test factor between best and second-best neighbor distance.
    pub lowe_ratio: f32,
    /// RANSAC reprojection tolerance in pixels.
    pub ransac_reproj_threshold: f32,
    /// Good-match minimum for the strict acceptance path.
    pub good_match_threshold: usize,
    /// Inlier-ratio minimum for the strict acceptance path.
    pub inlier_ratio_threshold: f32,
    /// Rescue path: absolute inlier count that is accepted on its own.
    pub rescue_min_inliers: usize,
    /// Rescue path: good-match count paired with `rescue_min_inlier_ratio`.
    pub rescue_min_good_matches: usize,
    /// Rescue path: inlier ratio paired with `rescue_min_good_matches`.
    pub rescue_min_inlier_ratio: f32,
    /// Seed for RANSAC sampling.
    pub ransac_seed: u64,
    /// Upper bound on RANSAC iterations.
    pub ransac_max_iters: usize,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            n_features: 1000,
            lowe_ratio: 0.75,
            ransac_reproj_threshold: 5.0,
            good_match_threshold: 40,
            inlier_ratio_threshold: 0.4,
            rescue_min_inliers: 18,
            rescue_min_good_matches: 30,
            rescue_min_inlier_ratio: 0.25,
            ransac_seed: 0x5eed,
            ransac_max_iters: 2000,
        }
    }
}

/// Correlation matcher settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct NccConfig {
    pub enabled: bool,
    /// Width both images are resized to before correlation.
    pub resize_width: usize,
    /// Minimum correlation accepted as a match.
    pub score_threshold: f32,
}

impl Default for NccConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resize_width: 256,
            score_threshold: 0.35,
        }
    }
}

/// Voting rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct VotingConfig {
    /// Detector votes needed for an overall match.
    pub required_votes: usize,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self { required_votes: 2 }
    }
}

/// Full engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub preprocessing: PreprocessConfig,
    pub color_gate: ColorGateConfig,
    pub phash: PhashConfig,
    pub orb: OrbConfig,
    pub ncc: NccConfig,
    pub voting: VotingConfig,
}

impl Config {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(text: &str) -> ProdMatchResult<Self> {
        let cfg: Config = serde_json::from_str(text)
            .map_err(|err| ProdMatchError::Configuration(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> ProdMatchResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            ProdMatchError::Configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Renders the configuration as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> ProdMatchResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| ProdMatchError::Report(err.to_string()))
    }

    /// Number of detectors that take part in voting.
    pub fn enabled_detectors(&self) -> usize {
        [self.phash.enabled, self.orb.enabled, self.ncc.enabled]
            .iter()
            .filter(|&&on| on)
            .count()
    }

    /// Checks every threshold for a usable range.
    pub fn validate(&self) -> ProdMatchResult<()> {
        fn check(ok: bool, msg: &str) -> ProdMatchResult<()> {
            if ok {
                Ok(())
            } else {
                Err(ProdMatchError::Configuration(msg.to_string()))
            }
        }

        let gate = &self.color_gate;
        check(
            (-1.0..=1.0).contains(&gate.hsv_corr_min),
            "colorGate.hsvCorrMin must lie in [-1, 1]",
        )?;
        check(
            gate.delta_e50_max.is_finite() && gate.delta_e50_max >= 0.0,
            "colorGate.deltaE50Max must be a non-negative number",
        )?;
        check(
            (0.0..=255.0).contains(&gate.chromatic_saturation_min),
            "colorGate.chromaticSaturationMin must lie in [0, 255]",
        )?;

        check(
            (2..=32).contains(&self.phash.hash_size),
            "phash.hashSize must lie in [2, 32]",
        )?;
        check(
            self.phash.hamming_threshold as usize <= self.phash.hash_size * self.phash.hash_size,
            "phash.hammingThreshold exceeds the number of hash bits",
        )?;

        let orb = &self.orb;
        check(orb.n_features >= 1, "orb.nFeatures must be at least 1")?;
        check(
            orb.lowe_ratio > 0.0 && orb.lowe_ratio <= 1.0,
            "orb.loweRatio must lie in (0, 1]",
        )?;
        check(
            orb.ransac_reproj_threshold.is_finite() && orb.ransac_reproj_threshold > 0.0,
            "orb.ransacReprojThreshold must be positive",
        )?;
        check(
            (0.0..=1.0).contains(&orb.inlier_ratio_threshold),
            "orb.inlierRatioThreshold must lie in [0, 1]",
        )?;
        check(
            (0.0..=1.0).contains(&orb.rescue_min_inlier_ratio),
            "orb.rescueMinInlierRatio must lie in [0, 1]",
        )?;
        check(
            orb.ransac_max_iters >= 1,
            "orb.ransacMaxIters must be at least 1",
        )?;

        check(
            self.ncc.resize_width >= 8,
            "ncc.resizeWidth must be at least 8",
        )?;
        check(
            (0.0..=1.0).contains(&self.ncc.score_threshold),
            "ncc.scoreThreshold must lie in [0, 1]",
        )?;

        let enabled = self.enabled_detectors();
        check(enabled >= 1, "at least one detector must be enabled")?;
        check(
            (1..=3).contains(&self.voting.required_votes),
            "voting.requiredVotes must lie in [1, 3]",
        )?;
        check(
            self.voting.required_votes <= enabled,
            "voting.requiredVotes exceeds the number of enabled detectors",
        )?;
        Ok(())
    }
}
