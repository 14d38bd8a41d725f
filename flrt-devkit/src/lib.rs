/*!
# FLRT DevKit - Fixtures et utilitaires de test

Bibliothèque facilitant les tests de flrt avec:
- Snaps AIX/VIOS synthétiques (general.snap, VIOS.level, oslevel.info)
- Archives tar.gz prêtes à scanner
- Fichiers d'inventaire FLRT
- Répertoires temporaires nettoyés automatiquement
*/

pub mod snap_fixture;
pub mod test_utils;

pub use snap_fixture::{tool_available, SnapFixture};
pub use test_utils::TestHarness;
