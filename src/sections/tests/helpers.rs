use tokio_util::sync::CancellationToken;

use super::{active_name, blind};
use crate::error::NavError;
use crate::page::ViewModelExt;
use crate::sections::{SectionsCoordinator, SetActiveSectionRequest};
use crate::testing::{
    ConfirmPage, DetailsPage, DisposeLog, HomePage, PopupPage, ProfilePage, SettingsPage,
    TestPage, page,
};

fn kinds(coordinator: &SectionsCoordinator, section: &str) -> Vec<String> {
    coordinator
        .section(section)
        .expect("section exists")
        .state()
        .stack()
        .iter()
        .map(|entry| entry.kind().short_name().to_string())
        .collect()
}

fn root<T: TestPage>(log: &DisposeLog) -> impl Fn() -> T + Send + Sync + 'static {
    let log = log.clone();
    move || T::create(log.clone(), false)
}

#[tokio::test]
async fn activating_an_empty_section_creates_its_root() {
    let log = DisposeLog::default();
    let coordinator = blind(&["Home", "Settings"]);

    let section = coordinator
        .set_active_section_with_root(&CancellationToken::new(), "Home", root::<HomePage>(&log), false)
        .await
        .unwrap()
        .expect("section activates");

    assert_eq!(section.name(), "Home");
    assert_eq!(kinds(&coordinator, "Home"), vec!["HomePage"]);
    assert_eq!(active_name(&coordinator).as_deref(), Some("HomePage"));
}

#[tokio::test]
async fn return_to_root_unwinds_or_restarts_the_section() {
    let log = DisposeLog::default();
    let coordinator = blind(&["Home", "Settings"]);
    let cancel = CancellationToken::new();
    let home = coordinator.section("Home").expect("section exists");
    for request in [
        page::<HomePage>(&log),
        page::<DetailsPage>(&log),
        page::<SettingsPage>(&log),
    ] {
        home.navigate(&cancel, request).await.unwrap();
    }
    coordinator
        .section("Settings")
        .expect("section exists")
        .navigate(&cancel, page::<DetailsPage>(&log))
        .await
        .unwrap();
    coordinator
        .set_active_section(&cancel, SetActiveSectionRequest::new("Settings"))
        .await
        .unwrap();

    coordinator
        .set_active_section_with_root(&cancel, "Home", root::<HomePage>(&log), true)
        .await
        .unwrap();
    assert_eq!(kinds(&coordinator, "Home"), vec!["HomePage"]);
    assert_eq!(log.entries(), vec!["DetailsPage", "SettingsPage"]);
    assert_eq!(coordinator.state().active_section_name(), Some("Home"));

    coordinator
        .set_active_section_with_root(&cancel, "Settings", root::<ProfilePage>(&log), true)
        .await
        .unwrap();
    assert_eq!(kinds(&coordinator, "Settings"), vec!["ProfilePage"]);
    assert_eq!(log.count("DetailsPage"), 2);
    assert_eq!(active_name(&coordinator).as_deref(), Some("ProfilePage"));
}

#[tokio::test]
async fn unknown_root_section_is_not_found() {
    let log = DisposeLog::default();
    let coordinator = blind(&["Home"]);

    let result = coordinator
        .set_active_section_with_root(&CancellationToken::new(), "Nowhere", root::<HomePage>(&log), false)
        .await;

    assert!(matches!(result, Err(NavError::NotFound(_))));
}

#[tokio::test]
async fn back_or_close_walks_modals_before_sections() {
    let log = DisposeLog::default();
    let coordinator = blind(&["Home"]);
    let cancel = CancellationToken::new();
    coordinator
        .set_active_section(&cancel, SetActiveSectionRequest::new("Home"))
        .await
        .unwrap();
    coordinator.navigate(&cancel, page::<HomePage>(&log)).await.unwrap();
    coordinator.navigate(&cancel, page::<DetailsPage>(&log)).await.unwrap();
    coordinator
        .open_modal_with(&cancel, root::<PopupPage>(&log), None, Some("Sheet"))
        .await
        .unwrap();
    coordinator.navigate(&cancel, page::<ConfirmPage>(&log)).await.unwrap();
    assert!(coordinator.can_navigate_back_or_close_modal());

    coordinator.navigate_back_or_close_modal(&cancel).await.unwrap();
    assert_eq!(active_name(&coordinator).as_deref(), Some("PopupPage"));

    coordinator.navigate_back_or_close_modal(&cancel).await.unwrap();
    assert!(coordinator.state().modals().is_empty());
    assert_eq!(active_name(&coordinator).as_deref(), Some("DetailsPage"));

    coordinator.navigate_back_or_close_modal(&cancel).await.unwrap();
    assert_eq!(active_name(&coordinator).as_deref(), Some("HomePage"));
    assert!(!coordinator.can_navigate_back_or_close_modal());

    let result = coordinator.navigate_back_or_close_modal(&cancel).await;
    assert!(matches!(result, Err(NavError::Usage(_))));
}

#[tokio::test]
async fn typed_helpers_target_the_active_stack() {
    let log = DisposeLog::default();
    let coordinator = blind(&["Home"]);
    let cancel = CancellationToken::new();

    let missing = coordinator.navigate(&cancel, page::<HomePage>(&log)).await;
    assert!(matches!(missing, Err(NavError::Usage(_))));

    let popup = coordinator
        .open_modal_with(&cancel, root::<PopupPage>(&log), Some(4), None)
        .await
        .unwrap();
    assert!(popup.is_some());
    assert_eq!(coordinator.state().modals()[0].name(), "Modal4");

    let details = coordinator
        .navigate_to(&cancel, root::<DetailsPage>(&log))
        .await
        .unwrap();
    assert!(details.is_some());
    let active = coordinator
        .active_view_model()
        .expect("the modal shows a page");
    assert!(active.downcast::<DetailsPage>().is_some());

    coordinator
        .navigate_and_clear(&cancel, root::<ProfilePage>(&log))
        .await
        .unwrap();
    let modal = coordinator.active_stack().expect("the modal is active");
    assert_eq!(modal.state().len(), 1);
    assert_eq!(log.entries(), vec!["PopupPage", "DetailsPage"]);
}
