use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one running on a
/// multi-threaded runtime, and inject dependencies.
///
/// Every test gets a fresh, empty in-memory store. Injectable dependencies are
/// [`rocket::local::asynchronous::Client`], `crate::store::StoreHandle`, and
/// `crate::model::db::user::User`. The last is only available with
/// `#[backend_test(admin)]` or `#[backend_test(voter)]`, which register a
/// user of that role and log the client in as them before the test starts.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Work out who to log in as, if anyone.
    let role = match parse_macro_input!(args as Option<Ident>) {
        None => None,
        Some(arg) if arg == "admin" => Some(quote! { crate::model::common::Role::Admin }),
        Some(arg) if arg == "voter" => Some(quote! { crate::model::common::Role::Voter }),
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `admin` or `voter`")
                .into_compile_error()
                .into();
        }
    };

    // Extract the dependencies to inject and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone(), role.is_some()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let maybe_login = match role {
        Some(role) => quote! {
            Some(crate::api::testing::register_and_login(&rocket_client, &store, #role).await)
        },
        None => quote! { None },
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            log4rs_test_utils::test_logging::init_logging_once_for(["evote_backend"], None, None);

            /// Test setup.
            async fn setup() -> (
                rocket::local::asynchronous::Client,
                crate::store::StoreHandle,
                Option<crate::model::db::user::User>,
            ) {
                let store = crate::store::StoreHandle::new(crate::store::MemoryStore::new());
                let rocket_client = rocket::local::asynchronous::Client::tracked(crate::rocket_for_store(store.clone()))
                    .await
                    .unwrap();
                let user = #maybe_login;
                (rocket_client, store, user)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #[allow(unused_variables)]
                let (rocket_client, store, user) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, map its parameters to injected values,
/// and reject unknown or duplicate parameters.
fn check_sig(sig: Signature, logged_in: bool) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_store = false;
    let mut has_user = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                // Match on the last path segment, so both `Client` and
                // `rocket::local::asynchronous::Client` are accepted.
                let type_ident = type_path.path.segments.last().map(|s| s.ident.to_string());
                match type_ident.as_deref() {
                    Some("Client") if !has_client => {
                        has_client = true;
                        args.push(quote! { rocket_client });
                        continue;
                    }
                    Some("StoreHandle") if !has_store => {
                        has_store = true;
                        args.push(quote! { store.clone() });
                        continue;
                    }
                    Some("User") if !has_user => {
                        if !logged_in {
                            return Err(syn::Error::new(
                                input.span(),
                                "A `User` can only be injected with `#[backend_test(admin)]` or `#[backend_test(voter)]`",
                            ));
                        }
                        has_user = true;
                        args.push(quote! { user.clone().unwrap() });
                        continue;
                    }
                    Some("Client") | Some("StoreHandle") | Some("User") => {
                        return Err(syn::Error::new(
                            input.span(),
                            "Each dependency can only be injected once",
                        ));
                    }
                    _ => {}
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `store_ident: StoreHandle` or `user_ident: User`",
        ));
    }

    Ok(args)
}
