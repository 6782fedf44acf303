mod glr_test;
mod llk_test;
mod packrat_test;
mod registry_test;
