//! Operator walkthroughs from route load to a fitted camera.

use composer_api::{CrossingDto, EntityId, EnumKind, RouteId};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::{TestComposer, empty_lsa_route, empty_sg_route, mounted, settle};
use crate::binding::{
    BindingColor, BindingState, BindingStore, ClassificationField, LsaBindings, SgBindings,
};
use crate::composer::ComposerError;
use crate::config::ComposerConfig;
use crate::constants::camera;
use crate::model::{Region, Viewport};
use crate::test_support::{RecordingDispatcher, enum_entry, region};
use crate::viewport_fit;

#[test]
fn test_click_cycle_on_loaded_route() {
    let backend = empty_lsa_route();
    let mut composer = mounted::<LsaBindings>(&backend);
    let a = EntityId::from(100);

    assert!(composer.view().bindings_loaded);
    assert!(composer.store().is_empty());

    // First click: selected, unconfirmed
    assert_eq!(composer.click_entity(&a).unwrap(), BindingState::Selected);
    assert_eq!(
        composer.store().snapshot_json().unwrap(),
        json!({"100": {
            "confirmed": false,
            "corresponding_constellation": null,
            "corresponding_route_error": null
        }})
    );
    assert_eq!(composer.store().color(&a), BindingColor::Yellow);

    // Second click: confirmed
    composer.click_entity(&a).unwrap();
    assert_eq!(composer.store().get(&a).map(|b| b.confirmed), Some(true));
    assert_eq!(composer.store().color(&a), BindingColor::Green);

    // Third click: gone
    composer.click_entity(&a).unwrap();
    assert!(composer.store().is_empty());
    assert_eq!(composer.store().color(&a), BindingColor::Red);
}

#[test]
fn test_checkbox_confirms_without_map_click() {
    let backend = empty_sg_route();
    backend.set_bindings(json!({"sgIds": [5, 6], "confirmed": [6]}));
    let mut composer = mounted::<SgBindings>(&backend);
    let b = EntityId::from(5);

    assert_eq!(composer.toggle_checkbox(&b).unwrap(), BindingState::Confirmed);
    assert_eq!(composer.store().len(), 2);

    let row = composer.view().row(&b).cloned().unwrap();
    assert_eq!(row.color, BindingColor::Green);
    assert_eq!(row.tint, "#27ae60");
    assert_eq!(row.constellation, None);
}

#[test]
fn test_fit_lands_inside_box() {
    let prior = Viewport {
        longitude: -120.0,
        latitude: -33.0,
        zoom: 2.0,
        pitch: 10.0,
        bearing: 5.0,
        width: 1024,
        height: 768,
    };
    let fitted = viewport_fit::fit(&prior, &Region::new(9.0, 53.0, 10.0, 54.0));
    assert!((9.0..=10.0).contains(&fitted.longitude));
    assert!((53.0..=54.0).contains(&fitted.latitude));
    assert!(fitted.zoom <= camera::MAX_FIT_ZOOM);
}

#[test]
fn test_mount_fits_route_region() {
    let backend = empty_lsa_route();
    let composer = mounted::<LsaBindings>(&backend);
    let viewport = composer.view().viewport;
    assert!(Region::new(9.9, 53.5, 10.1, 53.6).contains(viewport.longitude, viewport.latitude));
    assert_ne!(viewport.zoom, camera::INITIAL_ZOOM);
}

#[test]
fn test_configured_lsa_is_focused_after_bindings() {
    let backend = empty_lsa_route();
    backend.set_entity_region(EntityId::from(77), region(10.5, 53.7, 10.5001, 53.7001));

    let mut composer = TestComposer::<LsaBindings>::new(RecordingDispatcher::new());
    composer.mount(ComposerConfig::new(RouteId::from(1)).with_lsa_id(Some("77")));

    // The focus request only goes out once the bindings are applied
    let initial = composer.dispatcher_mut().drain();
    assert!(!initial.iter().any(|(_, r)| matches!(
        r,
        crate::fetch::FetchRequest::EntityRegion { .. }
    )));
    for (ticket, request) in initial {
        composer.apply(crate::fetch::FetchResult::run(ticket, request, &backend));
    }
    assert_eq!(
        composer
            .dispatcher()
            .count(|r| matches!(r, crate::fetch::FetchRequest::EntityRegion { .. })),
        1
    );
    settle(&mut composer, &backend);

    let viewport = composer.view().viewport;
    assert!((viewport.longitude - 10.50005).abs() < 1e-6);
}

#[test]
fn test_route_region_does_not_override_explicit_region() {
    let backend = empty_lsa_route();
    let mut composer = TestComposer::<LsaBindings>::new(RecordingDispatcher::new());
    composer.mount(ComposerConfig::new(RouteId::from(1)));

    let target = Region::new(11.0, 48.0, 11.1, 48.1);
    let shown = composer.show_region(&target);
    settle(&mut composer, &backend);

    assert_eq!(composer.view().viewport, shown);
}

#[test]
fn test_crossing_selection_moves_camera() {
    let backend = empty_sg_route();
    backend.set_crossings(vec![CrossingDto {
        id: EntityId::from(271),
        sgs: 8,
        extent: [9.99, 53.55, 10.0, 53.56],
    }]);
    let mut composer = mounted::<SgBindings>(&backend);

    let viewport = composer.select_crossing(&EntityId::from(271)).unwrap();
    assert!(Region::new(9.99, 53.55, 10.0, 53.56).contains(viewport.longitude, viewport.latitude));

    let view = composer.view();
    assert_eq!(view.crossings.len(), 1);
    assert!(view.crossings[0].selected);
    assert_eq!(view.crossings[0].sgs, 8);

    assert!(matches!(
        composer.select_crossing(&EntityId::from(1)),
        Err(ComposerError::UnknownCrossing(_))
    ));
}

#[test]
fn test_classification_uses_fetched_enumerations() {
    let backend = empty_lsa_route();
    backend.set_enumeration(EnumKind::Constellation, vec![enum_entry(3, "Straight")]);
    backend.set_enumeration(EnumKind::RouteError, vec![enum_entry(9, "Wrong lane")]);
    let mut composer = mounted::<LsaBindings>(&backend);
    let a = EntityId::from(1);
    composer.click_entity(&a).unwrap();

    assert!(composer
        .set_classification(&a, ClassificationField::Constellation, Some(3))
        .unwrap());
    assert!(matches!(
        composer.set_classification(&a, ClassificationField::RouteError, Some(3)),
        Err(ComposerError::Binding(_))
    ));

    let row = composer.view().row(&a).cloned().unwrap();
    assert_eq!(row.constellation.as_deref(), Some("Straight"));
    assert_eq!(row.route_error.as_deref(), Some("-"));
}

#[test]
fn test_sg_mount_skips_enumerations() {
    let mut composer = TestComposer::<SgBindings>::new(RecordingDispatcher::new());
    composer.mount(ComposerConfig::new(RouteId::from(1)));
    assert_eq!(composer.dispatcher().queue.len(), 3);
    assert_eq!(
        composer
            .dispatcher()
            .count(|r| matches!(r, crate::fetch::FetchRequest::Enumeration(_))),
        0
    );
}
