pub use enclose::*;

#[macro_export]
macro_rules! derived {
    (( $($d_tt:tt)* ) [ $($src:expr),+ $(,)? ] $values:pat => $($b:tt)*) => {
        $crate::DerivedProperty::new(( $($src.clone(),)+ ), $crate::macros::enclose!(($( $d_tt )*) move |$values| { $($b)* }))
    };
    ([ $($src:expr),+ $(,)? ] $values:pat => $($b:tt)*) => {
        $crate::DerivedProperty::new(( $($src.clone(),)+ ), move |$values| { $($b)* })
    };
}

#[macro_export]
macro_rules! multilink {
    (( $($d_tt:tt)* ) [ $($src:expr),+ $(,)? ] $values:pat => $($b:tt)*) => {
        $crate::multilink(( $($src.clone(),)+ ), $crate::macros::enclose!(($( $d_tt )*) move |$values| { $($b)* }))
    };
    ([ $($src:expr),+ $(,)? ] $values:pat => $($b:tt)*) => {
        $crate::multilink(( $($src.clone(),)+ ), move |$values| { $($b)* })
    };
}

#[macro_export]
macro_rules! lazy_multilink {
    (( $($d_tt:tt)* ) [ $($src:expr),+ $(,)? ] $values:pat => $($b:tt)*) => {
        $crate::lazy_multilink(( $($src.clone(),)+ ), $crate::macros::enclose!(($( $d_tt )*) move |$values| { $($b)* }))
    };
    ([ $($src:expr),+ $(,)? ] $values:pat => $($b:tt)*) => {
        $crate::lazy_multilink(( $($src.clone(),)+ ), move |$values| { $($b)* })
    };
}
