#![no_main]
use feature_store::{
    FeatureDataStore, FeatureDefinition, FeatureQueryParameters, FeatureSetDefinition,
    FeatureUpdate, Geometry, StoreBuilder,
};
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

#[derive(Debug, Arbitrary)]
enum Op {
    InsertSet { name: u8 },
    Insert { set: u8, name: u8, x: i16, y: i16 },
    Rename { id: u8, name: u8 },
    Move { id: u8, x: i16, y: i16 },
    Delete { id: u8 },
    DeleteSet { set: u8 },
    Hide { id: u8 },
    HideSet { set: u8, visible: bool },
    Query { offset: u8, limit: Option<u8>, name: Option<u8> },
    BeginBulk,
    EndBulk { successful: bool },
}

fn coord(v: i16, span: f64) -> f64 {
    f64::from(v) / f64::from(i16::MAX) * span
}

// Random operation sequences must never panic or desynchronize indices
fuzz_target!(|ops: Vec<Op>| {
    let store = match StoreBuilder::new().build() {
        Ok(s) => s,
        Err(_) => return,
    };

    for op in ops.iter().take(256) {
        match op {
            Op::InsertSet { name } => {
                let _ = store.insert_feature_set(FeatureSetDefinition::new("fuzz", "ops", format!("s{}", name)));
            }
            Op::Insert { set, name, x, y } => {
                if let Ok(geometry) = Geometry::point(coord(*x, 180.0), coord(*y, 90.0)) {
                    let _ = store.insert_feature(FeatureDefinition::new(
                        i64::from(*set),
                        format!("f{}", name),
                        geometry,
                    ));
                }
            }
            Op::Rename { id, name } => {
                let _ = store.update_feature(i64::from(*id), &FeatureUpdate::new().name(format!("f{}", name)));
            }
            Op::Move { id, x, y } => {
                if let Ok(geometry) = Geometry::point(coord(*x, 180.0), coord(*y, 90.0)) {
                    let _ = store.update_feature(i64::from(*id), &FeatureUpdate::new().geometry(geometry));
                }
            }
            Op::Delete { id } => {
                let _ = store.delete_feature(i64::from(*id));
            }
            Op::DeleteSet { set } => {
                let _ = store.delete_feature_set(i64::from(*set));
            }
            Op::Hide { id } => {
                let _ = store.set_feature_visible(i64::from(*id), false);
            }
            Op::HideSet { set, visible } => {
                let _ = store.set_feature_set_visible(i64::from(*set), *visible);
            }
            Op::Query { offset, limit, name } => {
                let mut params = FeatureQueryParameters::new().offset(usize::from(*offset));
                params.limit = limit.map(usize::from);
                if let Some(name) = name {
                    params = params.feature_names([format!("f{}%", name)]);
                }
                if let Ok(mut cursor) = store.query_features(&params) {
                    while let Ok(true) = cursor.move_to_next() {
                        let _ = cursor.get();
                    }
                }
            }
            Op::BeginBulk => {
                let _ = store.begin_bulk_modification();
            }
            Op::EndBulk { successful } => {
                let _ = store.end_bulk_modification(*successful);
            }
        }
    }

    if let Ok(verdict) = store.with_engine(|engine| engine.verify_indices()) {
        assert!(verdict.is_ok(), "{:?}", verdict);
    }
});
