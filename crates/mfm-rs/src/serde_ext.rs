//! Serde helpers for values JSON cannot carry natively.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Repr {
    Num(f64),
    Tag(String),
}

fn to_repr(v: f64) -> Repr {
    if v.is_nan() {
        Repr::Tag("nan".into())
    } else if v == f64::INFINITY {
        Repr::Tag("inf".into())
    } else if v == f64::NEG_INFINITY {
        Repr::Tag("-inf".into())
    } else {
        Repr::Num(v)
    }
}

fn from_repr<E: serde::de::Error>(r: Repr) -> Result<f64, E> {
    match r {
        Repr::Num(v) => Ok(v),
        Repr::Tag(tag) => match tag.as_str() {
            "nan" => Ok(f64::NAN),
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            other => Err(E::custom(format!("unexpected float tag '{}'", other))),
        },
    }
}

/// `Vec<f64>` with `inf`, `-inf` and `nan` written as strings
pub mod nonfinite_vec {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|&v| to_repr(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Repr>::deserialize(deserializer)?
            .into_iter()
            .map(from_repr)
            .collect()
    }
}

/// Power threshold as a plain dB number, or `"off"` when disabled
pub mod power_threshold {
    use super::*;
    use bgtcs_dbs::PowerThreshold;

    pub fn serialize<S: Serializer>(
        thr: &PowerThreshold,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match thr {
            PowerThreshold::Disabled => serializer.serialize_str("off"),
            PowerThreshold::Db(db) => to_repr(*db).serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<PowerThreshold, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Num(db) => Ok(PowerThreshold::from_db(db)),
            Repr::Tag(tag) => tag.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgtcs_dbs::PowerThreshold;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Wrapper {
        #[serde(with = "nonfinite_vec")]
        values: Vec<f64>,
        #[serde(with = "power_threshold")]
        thr: PowerThreshold,
    }

    #[test]
    fn test_nonfinite_values_survive_json() {
        let w = Wrapper {
            values: vec![0.0, f64::NEG_INFINITY, -12.5, f64::INFINITY],
            thr: PowerThreshold::Db(-28.57),
        };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("\"-inf\""));
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn test_threshold_forms() {
        let off: Wrapper = serde_json::from_str(r#"{"values": [], "thr": "off"}"#).unwrap();
        assert_eq!(off.thr, PowerThreshold::Disabled);
        let db: Wrapper = serde_json::from_str(r#"{"values": [1.0], "thr": -30}"#).unwrap();
        assert_eq!(db.thr, PowerThreshold::Db(-30.0));
        let inf: Wrapper = serde_json::from_str(r#"{"values": [], "thr": "-inf"}"#).unwrap();
        assert_eq!(inf.thr, PowerThreshold::Disabled);
    }
}
